// src/transform/prefix.rs

use regex::{Captures, Regex};

use crate::errors::ToolError;
use crate::pipeline::record::FileRecord;
use crate::transform::Transform;

/// Properties that still need vendor-prefixed copies, with their prefixes.
const PREFIXED: &[(&str, &[&str])] = &[
    ("user-select", &["-webkit-", "-moz-"]),
    ("appearance", &["-webkit-", "-moz-"]),
    ("backdrop-filter", &["-webkit-"]),
    ("text-size-adjust", &["-webkit-", "-moz-"]),
    ("hyphens", &["-webkit-"]),
    ("mask-image", &["-webkit-"]),
];

/// Adds vendor-prefixed duplicates in front of declarations listed in a
/// fixed property table. Declarations that already carry a prefix are left
/// alone, so running it twice adds nothing new.
#[derive(Debug)]
pub struct Autoprefix {
    declaration: Regex,
}

impl Autoprefix {
    pub fn new() -> Self {
        let props: Vec<&str> = PREFIXED.iter().map(|(p, _)| *p).collect();
        let pattern = format!(r"([{{;]\s*)({})(\s*:[^;{{}}]+)", props.join("|"));
        Self {
            declaration: Regex::new(&pattern).expect("valid regex"),
        }
    }

    fn prefix_css(&self, css: &str) -> String {
        self.declaration
            .replace_all(css, |caps: &Captures| {
                let prop = &caps[2];
                let value = &caps[3];
                let prefixes = PREFIXED
                    .iter()
                    .find(|(p, _)| *p == prop)
                    .map(|(_, v)| *v)
                    .unwrap_or_default();

                let start = caps.get(0).map_or(0, |m| m.start());
                let block = css[..start].rfind('{').unwrap_or(0);
                let already = prefixes
                    .iter()
                    .any(|prefix| css[block..start].contains(&format!("{prefix}{prop}")));
                if already {
                    return caps[0].to_string();
                }

                let mut out = caps[1].to_string();
                for prefix in prefixes {
                    out.push_str(&format!("{prefix}{prop}{value};"));
                }
                out.push_str(prop);
                out.push_str(value);
                out
            })
            .into_owned()
    }
}

impl Default for Autoprefix {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for Autoprefix {
    fn name(&self) -> &str {
        "autoprefix"
    }

    fn apply(&self, files: Vec<FileRecord>) -> Result<Vec<FileRecord>, ToolError> {
        files
            .into_iter()
            .map(|mut file| {
                if file.has_extension(&["css"]) {
                    let prefixed = self.prefix_css(file.text(self.name())?);
                    file.contents = prefixed.into_bytes();
                }
                Ok(file)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_known_properties_once() {
        let t = Autoprefix::new();
        let css = "a{user-select:none;color:red}";
        let once = t.prefix_css(css);
        assert_eq!(
            once,
            "a{-webkit-user-select:none;-moz-user-select:none;user-select:none;color:red}"
        );
        assert_eq!(t.prefix_css(&once), once);
    }

    #[test]
    fn leaves_other_declarations_alone() {
        let t = Autoprefix::new();
        let css = "a {\n  color: red;\n}";
        assert_eq!(t.prefix_css(css), css);
    }
}
