use itertools::Itertools;

/// Shape tag for matches with more than three allyteams.
pub const FFA_TAG: &str = "FFA";

/// Splits a user supplied, comma separated tag string. Tokens are trimmed and
/// empty ones dropped.
pub fn split_tags(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Derives the match shape from the number of teams in each allyteam:
/// `[2, 2]` gives `"2v2"`, more than three allyteams give `"FFA"`.
pub fn shape_tag(team_counts: &[i64]) -> String {
    if team_counts.len() > 3 {
        FFA_TAG.to_string()
    } else {
        team_counts.iter().join("v")
    }
}

/// Prefixes the short description with the shape tag unless it already
/// mentions it.
pub fn compose_title(autotag: &str, short: &str) -> String {
    if short.contains(autotag) {
        short.to_string()
    } else {
        format!("{autotag} {short}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_tags() {
        assert_eq!(split_tags(" tourney, ,BA ,, final "), vec!["tourney", "BA", "final"]);
        assert!(split_tags("").is_empty());
        assert!(split_tags(" , ").is_empty());
    }

    #[test]
    fn test_shape_tag() {
        assert_eq!(shape_tag(&[2, 2]), "2v2");
        assert_eq!(shape_tag(&[1, 1]), "1v1");
        assert_eq!(shape_tag(&[3, 2, 1]), "3v2v1");
        assert_eq!(shape_tag(&[1, 1, 1, 1, 1]), "FFA");
        assert_eq!(shape_tag(&[4, 4, 4, 4]), "FFA");
        assert_eq!(shape_tag(&[1]), "1");
        assert_eq!(shape_tag(&[]), "");
    }

    #[test]
    fn test_compose_title() {
        assert_eq!(compose_title("2v2", "close game"), "2v2 close game");
        assert_eq!(compose_title("2v2", "epic 2v2 on DSD"), "epic 2v2 on DSD");
        assert_eq!(compose_title("", "anything"), "anything");
    }
}
