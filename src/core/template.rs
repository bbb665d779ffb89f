use crate::utils::error::{RestError, Result};
use regex::Regex;
use std::fmt::Display;
use std::sync::OnceLock;

/// Positional call argument, rendered with `Display`.
pub type Arg<'a> = &'a (dyn Display + Sync);

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{[^{}]*\}").expect("placeholder pattern is valid"))
}

/// Concatenates URL parts, collapsing a doubled `/` at each seam.
pub fn join_url(parts: &[&str]) -> String {
    let mut url = String::new();
    for part in parts.iter().filter(|p| !p.is_empty()) {
        if url.ends_with('/') && part.starts_with('/') {
            url.push_str(&part[1..]);
        } else {
            url.push_str(part);
        }
    }
    url
}

/// Replaces each placeholder with the argument at the same position.
///
/// Substitution is textual, nothing is URL-encoded. Extra arguments are
/// ignored; a placeholder without argument is a call contract error.
pub fn expand(operation: &str, template: &str, args: &[Arg<'_>]) -> Result<String> {
    let mut expanded = String::with_capacity(template.len());
    let mut last = 0;

    for (index, found) in placeholder().find_iter(template).enumerate() {
        let arg = args.get(index).ok_or_else(|| RestError::MissingArgument {
            operation: operation.to_string(),
            placeholder: found.as_str().to_string(),
            given: args.len(),
        })?;
        expanded.push_str(&template[last..found.start()]);
        expanded.push_str(&arg.to_string());
        last = found.end();
    }
    expanded.push_str(&template[last..]);

    Ok(expanded)
}

/// Rewrites placeholders into the `:p1`, `:p2`, ... form used by the server
/// router. Arguments are positional; declared names are dropped.
pub fn to_router_path(template: &str) -> String {
    let mut index = 0;
    placeholder()
        .replace_all(template, |_: &regex::Captures| {
            index += 1;
            format!(":p{}", index)
        })
        .into_owned()
}

/// First placeholder that does not end its path segment, e.g. `{name}`
/// in `/{name}.txt`. The router captures whole segment tails, so such a
/// template cannot hand back the argument alone.
pub fn trailing_placeholder(template: &str) -> Option<&str> {
    placeholder()
        .find_iter(template)
        .find(|found| {
            template[found.end()..]
                .chars()
                .next()
                .is_some_and(|next| next != '/')
        })
        .map(|found| found.as_str())
}
