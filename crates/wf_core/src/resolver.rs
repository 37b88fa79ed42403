//! Matching a file named by the oracle against the files that exist.
//!
//! Resolution order: exact path, unique suffix match on a path boundary,
//! shortest path among several suffix matches, unique basename containment.
//! Anything ambiguous resolves to nothing.

/// Normalize a path as written by the oracle: `/` separators, no leading
/// `./` or `/`, no surrounding whitespace or quotes.
pub fn normalize(path: &str) -> String {
    let mut normalized = path
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .replace('\\', "/");
    loop {
        if let Some(rest) = normalized.strip_prefix("./") {
            normalized = rest.to_string();
        } else if let Some(rest) = normalized.strip_prefix('/') {
            normalized = rest.to_string();
        } else {
            break;
        }
    }
    normalized
}

/// Resolve `target` to exactly one of `available`.
pub fn resolve_target(target: &str, available: &[String]) -> Option<String> {
    let target = normalize(target);
    if target.is_empty() {
        return None;
    }

    if let Some(exact) = available.iter().find(|p| normalize(p) == target) {
        return Some(exact.clone());
    }

    let boundary_suffix = format!("/{}", target);
    let suffix_matches: Vec<&String> = available
        .iter()
        .filter(|p| normalize(p).ends_with(&boundary_suffix))
        .collect();
    match suffix_matches.len() {
        0 => {}
        1 => return Some(suffix_matches[0].clone()),
        _ => return shortest_unique(&suffix_matches),
    }

    let basename = target.rsplit('/').next().unwrap_or(&target);
    let containing: Vec<&String> = available
        .iter()
        .filter(|p| normalize(p).contains(basename))
        .collect();
    if containing.len() == 1 {
        return Some(containing[0].clone());
    }
    None
}

fn shortest_unique(candidates: &[&String]) -> Option<String> {
    let shortest = candidates.iter().map(|p| p.len()).min()?;
    let mut at_shortest = candidates.iter().filter(|p| p.len() == shortest);
    let first = at_shortest.next()?;
    if at_shortest.next().is_some() {
        return None;
    }
    Some((*first).clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("./app/page.tsx"), "app/page.tsx");
        assert_eq!(normalize(" /app\\page.tsx "), "app/page.tsx");
        assert_eq!(normalize("`app/page.tsx`"), "app/page.tsx");
    }

    #[test]
    fn test_exact_match_wins() {
        let available = files(&["page.tsx", "app/page.tsx"]);
        assert_eq!(resolve_target("page.tsx", &available).as_deref(), Some("page.tsx"));
        assert_eq!(
            resolve_target("./app/page.tsx", &available).as_deref(),
            Some("app/page.tsx")
        );
    }

    #[test]
    fn test_unique_suffix_match() {
        let available = files(&["app/page.tsx", "app/layout.tsx"]);
        assert_eq!(resolve_target("page.tsx", &available).as_deref(), Some("app/page.tsx"));
    }

    #[test]
    fn test_suffix_respects_path_boundaries() {
        let available = files(&["app/homepage.tsx"]);
        // "page.tsx" is not a path suffix of "homepage.tsx", but the basename
        // is contained in it.
        assert_eq!(
            resolve_target("page.tsx", &available).as_deref(),
            Some("app/homepage.tsx")
        );

        let available = files(&["app/homepage.tsx", "app/frontpage.tsx"]);
        assert_eq!(resolve_target("page.tsx", &available), None);
    }

    #[test]
    fn test_shortest_suffix_match_breaks_ties() {
        let available = files(&["app/about/page.tsx", "app/page.tsx"]);
        assert_eq!(resolve_target("page.tsx", &available).as_deref(), Some("app/page.tsx"));

        let available = files(&["app/page.tsx", "src/page.tsx"]);
        assert_eq!(resolve_target("page.tsx", &available), None);
    }

    #[test]
    fn test_basename_containment() {
        let available = files(&["app/components/Hero.tsx", "app/page.tsx"]);
        assert_eq!(
            resolve_target("src/components/Hero.tsx", &available).as_deref(),
            Some("app/components/Hero.tsx")
        );
    }

    #[test]
    fn test_no_match() {
        let available = files(&["app/page.tsx"]);
        assert_eq!(resolve_target("components/Footer.tsx", &available), None);
        assert_eq!(resolve_target("", &available), None);
        assert_eq!(resolve_target("page.tsx", &[]), None);
    }
}
