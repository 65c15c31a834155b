mod progress;
mod styling;
mod summary;
mod tables;

pub use progress::PhaseProgress;
pub use styling::{brand, label};
pub use summary::print_summary;

/// Prints the `statsgen` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        brand("📈 statsgen"),
        label(env!("CARGO_PKG_VERSION")),
        label("GitHub profile statistics")
    );
}
