//! Home directory discovery.

use std::path::PathBuf;

/// Home directory from the process environment.
pub fn home_dir() -> Option<PathBuf> {
    home_dir_from(|name| std::env::var(name).ok())
}

/// Home directory from `lookup`: `HOME`, then `USERPROFILE`, then
/// `HOMEDRIVE` + `HOMEPATH`. Empty values count as unset.
pub fn home_dir_from(lookup: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(home) = get("HOME") {
        return Some(PathBuf::from(home));
    }
    if let Some(profile) = get("USERPROFILE") {
        return Some(PathBuf::from(profile));
    }
    match (get("HOMEDRIVE"), get("HOMEPATH")) {
        (Some(drive), Some(path)) => Some(PathBuf::from(format!("{drive}{path}"))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_home_takes_precedence() {
        let lookup = env(&[("HOME", "/home/ada"), ("USERPROFILE", "C:\\Users\\ada")]);
        assert_eq!(home_dir_from(lookup), Some(PathBuf::from("/home/ada")));
    }

    #[test]
    fn test_userprofile_then_drive_and_path() {
        assert_eq!(
            home_dir_from(env(&[("HOME", ""), ("USERPROFILE", "C:\\Users\\ada")])),
            Some(PathBuf::from("C:\\Users\\ada"))
        );
        assert_eq!(
            home_dir_from(env(&[("HOMEDRIVE", "D:"), ("HOMEPATH", "\\ada")])),
            Some(PathBuf::from("D:\\ada"))
        );
    }

    #[test]
    fn test_no_home() {
        assert_eq!(home_dir_from(env(&[("HOMEDRIVE", "D:")])), None);
    }
}
