/// Color used when neither GitHub nor the built-in table knows a language.
pub const DEFAULT_LANGUAGE_COLOR: &str = "#858585";

/// Picks the display color for a language.
///
/// GitHub's color wins when present; otherwise the color comes from a fixed
/// table keyed by language name, so the same language always gets the same color.
pub fn language_color(name: &str, platform_color: Option<&str>) -> String {
    platform_color
        .map(str::trim)
        .filter(|color| !color.is_empty())
        .or_else(|| builtin_color(name))
        .unwrap_or(DEFAULT_LANGUAGE_COLOR)
        .to_string()
}

fn builtin_color(name: &str) -> Option<&'static str> {
    let color = match name {
        "C" => "#555555",
        "C#" => "#178600",
        "C++" => "#f34b7d",
        "CSS" => "#563d7c",
        "Clojure" => "#db5855",
        "CoffeeScript" => "#244776",
        "Dart" => "#00B4AB",
        "Dockerfile" => "#384d54",
        "Elixir" => "#6e4a7e",
        "Elm" => "#60B5CC",
        "Erlang" => "#B83998",
        "Go" => "#00ADD8",
        "Groovy" => "#4298b8",
        "HCL" => "#844FBA",
        "HTML" => "#e34c26",
        "Haskell" => "#5e5086",
        "Java" => "#b07219",
        "JavaScript" => "#f1e05a",
        "Jupyter Notebook" => "#DA5B0B",
        "Kotlin" => "#A97BFF",
        "Lua" => "#000080",
        "Makefile" => "#427819",
        "Nix" => "#7e7eff",
        "OCaml" => "#ef7a08",
        "Objective-C" => "#438eff",
        "PHP" => "#4F5D95",
        "Perl" => "#0298c3",
        "PowerShell" => "#012456",
        "Python" => "#3572A5",
        "R" => "#198CE7",
        "Ruby" => "#701516",
        "Rust" => "#dea584",
        "SCSS" => "#c6538c",
        "Scala" => "#c22d40",
        "Shell" => "#89e051",
        "Svelte" => "#ff3e00",
        "Swift" => "#F05138",
        "TeX" => "#3D6117",
        "TypeScript" => "#3178c6",
        "Vue" => "#41b883",
        "Zig" => "#ec915c",
        _ => return None,
    };
    Some(color)
}
