//! Polar file discovery.
//!
//! Files are matched on their names only: a profile filter is a substring of
//! the file name, and so is the Reynolds filter (`0.688` matches
//! `..._Re0.688_...`). Results are always ordered by file name.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::constants::Constants;
use crate::errors::{CalcError, CalcResult};
use crate::parser::parse_polar_file_or_empty;

const POLAR_EXTENSION: &str = "txt";

/// Marker between the profile name and the run parameters in XFLR5 file names.
const RUN_MARKER: &str = "_T1_Re";

/// Which files of a directory to analyse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Profile-name substrings; empty selects every profile
    pub profiles: Vec<String>,
    /// Reynolds substring of the file name
    pub reynolds: Option<String>,
}

impl Selection {
    /// Selection from a comma-separated profile list and an optional Reynolds filter.
    pub fn new(profiles: Option<&str>, reynolds: Option<&str>) -> Self {
        let profiles = profiles
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            profiles,
            reynolds: reynolds.map(str::to_string).filter(|r| !r.is_empty()),
        }
    }

    fn accepts(&self, file_name: &str) -> bool {
        let profile_ok =
            self.profiles.is_empty() || self.profiles.iter().any(|p| file_name.contains(p.as_str()));
        let re_ok = self
            .reynolds
            .as_deref()
            .is_none_or(|re| file_name.contains(re));
        profile_ok && re_ok
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// All `*.txt` files of a directory, sorted by name.
pub fn list_polar_files(dir: &Path) -> CalcResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| CalcError::file_error("read dir", dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| CalcError::file_error("read dir", dir, e))?
            .path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == POLAR_EXTENSION) {
            files.push(path);
        }
    }
    files.sort_by_key(|p| file_name(p));
    Ok(files)
}

/// Files of `dir` matching the selection. Fails when nothing matches.
pub fn select_files(dir: &Path, selection: &Selection) -> CalcResult<Vec<PathBuf>> {
    let files: Vec<PathBuf> = list_polar_files(dir)?
        .into_iter()
        .filter(|path| selection.accepts(&file_name(path)))
        .collect();
    if files.is_empty() {
        return Err(CalcError::no_matching_files(
            dir,
            &selection.profiles,
            selection.reynolds.as_deref(),
        ));
    }
    Ok(files)
}

/// Raw `Re<digits.>` token of a file name (`0.688` for `..._Re0.688_...`).
pub fn reynolds_token(name: &str) -> Option<&str> {
    name.match_indices("Re").find_map(|(pos, _)| {
        let rest = &name[pos + 2..];
        let end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        (end > 0).then(|| &rest[..end])
    })
}

/// Reynolds values available in a directory.
///
/// File names carrying a `Re` token contribute the token; other files
/// contribute the Reynolds number from their header, when they have one.
/// A file that cannot be read contributes nothing; it never fails the listing.
pub fn list_available_re(dir: &Path, constants: &Constants) -> CalcResult<Vec<String>> {
    Ok(reynolds_values(&list_polar_files(dir)?, constants))
}

/// Distinct Reynolds values of `files`, sorted.
pub fn reynolds_values(files: &[PathBuf], constants: &Constants) -> Vec<String> {
    let mut values = BTreeSet::new();
    for path in files {
        match reynolds_token(&file_name(path)) {
            Some(token) => {
                values.insert(token.to_string());
            }
            None => {
                if let Some(re) = parse_polar_file_or_empty(path, constants).reynolds {
                    values.insert(re.to_string());
                }
            }
        }
    }
    values.into_iter().collect()
}

/// Profiles grouped by the Reynolds token of their file names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    /// Reynolds token to sorted profile names, keys in numeric order
    pub by_reynolds: Vec<(String, Vec<String>)>,
    /// Every distinct profile name, sorted
    pub profiles: Vec<String>,
    /// Number of polar files seen
    pub total_files: usize,
}

/// Profile name part of an XFLR5 file name.
pub fn profile_from_file_name(name: &str) -> &str {
    name.split(RUN_MARKER).next().unwrap_or(name)
}

/// Scan a directory and group its profiles by Reynolds token.
pub fn inventory(dir: &Path) -> CalcResult<Inventory> {
    let files = list_polar_files(dir)?;
    let mut groups: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut profiles = BTreeSet::new();
    for path in &files {
        let name = file_name(path);
        if let Some(token) = reynolds_token(&name) {
            let profile = profile_from_file_name(&name).to_string();
            groups
                .entry(token.to_string())
                .or_default()
                .insert(profile.clone());
            profiles.insert(profile);
        }
    }

    let mut by_reynolds: Vec<(String, Vec<String>)> = groups
        .into_iter()
        .map(|(re, set)| (re, set.into_iter().collect()))
        .collect();
    by_reynolds.sort_by(|(a, _), (b, _)| {
        let x = a.parse::<f64>().unwrap_or(f64::INFINITY);
        let y = b.parse::<f64>().unwrap_or(f64::INFINITY);
        x.total_cmp(&y).then_with(|| a.cmp(b))
    });

    Ok(Inventory {
        by_reynolds,
        profiles: profiles.into_iter().collect(),
        total_files: files.len(),
    })
}

/// Reynolds token rendered in millions (`0.688` → `0.688e6`).
fn reynolds_in_millions(token: &str) -> String {
    match token.parse::<f64>() {
        Ok(v) if v < 1.0 => format!("{v:.3}e6"),
        Ok(v) => format!("{:.3}e6", v / 1e6),
        Err(_) => token.to_string(),
    }
}

impl Inventory {
    /// Plain-text report of the inventory.
    pub fn report(&self) -> String {
        let rule = "=".repeat(80);
        let thin = "-".repeat(80);
        let mut out = String::new();

        let _ = writeln!(out, "{rule}\nAVAILABLE PROFILES AND REYNOLDS NUMBERS\n{rule}\n");
        let _ = writeln!(out, "SUMMARY\n{thin}");
        let _ = writeln!(out, "Total unique profiles: {}", self.profiles.len());
        let _ = writeln!(out, "Reynolds numbers available: {}", self.by_reynolds.len());
        let _ = writeln!(out, "Total polar files: {}\n\n{rule}\n", self.total_files);

        let _ = writeln!(out, "REYNOLDS NUMBERS AVAILABLE\n{thin}\n");
        for (re, profiles) in &self.by_reynolds {
            let _ = writeln!(
                out,
                "  Re {re:>5}  ({:>10})  -  {:3} profiles",
                reynolds_in_millions(re),
                profiles.len()
            );
        }

        let _ = writeln!(out, "\n{rule}\n\nALL AVAILABLE PROFILES (alphabetically)\n{thin}\n");
        for (i, profile) in self.profiles.iter().enumerate() {
            let _ = writeln!(out, "{:3}. {profile}", i + 1);
        }

        let _ = writeln!(out, "\n{rule}\n\nPROFILES BY REYNOLDS NUMBER\n{thin}");
        for (re, profiles) in &self.by_reynolds {
            let _ = writeln!(out, "\nReynolds Number: {re} ({})", reynolds_in_millions(re));
            let _ = writeln!(out, "Number of profiles: {}\n{}", profiles.len(), "-".repeat(40));
            for (i, profile) in profiles.iter().enumerate() {
                let _ = writeln!(out, "  {:3}. {profile}", i + 1);
            }
        }
        let _ = write!(out, "\n{rule}\nEND OF FILE\n{rule}");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn populate(dir: &Path) {
        for name in [
            "NACA 2412_T1_Re0.688_M0.00_N9.0.txt",
            "NACA 2412_T1_Re0.100_M0.00_N9.0.txt",
            "E387_T1_Re0.688_M0.00_N9.0.txt",
            "SD7037_T1_Re0.100_M0.00_N9.0.txt",
            "notes.md",
        ] {
            fs::write(dir.join(name), "x").unwrap();
        }
        fs::write(dir.join("custom.txt"), " Re =  0.25 e 6 \n").unwrap();
    }

    fn names(files: &[PathBuf]) -> Vec<String> {
        files.iter().map(|p| file_name(p)).collect()
    }

    #[test]
    fn test_list_sorted_txt_only() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());
        let files = list_polar_files(dir.path()).unwrap();
        assert_eq!(files.len(), 5);
        let listed = names(&files);
        let mut sorted = listed.clone();
        sorted.sort();
        assert_eq!(listed, sorted);
    }

    #[test]
    fn test_select_by_profile_and_re() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());
        let sel = Selection::new(Some("NACA, E387"), Some("0.688"));
        let files = select_files(dir.path(), &sel).unwrap();
        assert_eq!(
            names(&files),
            vec![
                "E387_T1_Re0.688_M0.00_N9.0.txt".to_string(),
                "NACA 2412_T1_Re0.688_M0.00_N9.0.txt".to_string(),
            ]
        );
    }

    #[test]
    fn test_overlapping_profile_filters_do_not_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());
        let sel = Selection::new(Some("NACA,2412"), None);
        assert_eq!(select_files(dir.path(), &sel).unwrap().len(), 2);
    }

    #[test]
    fn test_no_match_is_error() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());
        let sel = Selection::new(Some("Clark"), None);
        let err = select_files(dir.path(), &sel).unwrap_err();
        assert_eq!(err.error_code(), "NO_MATCHING_FILES");
    }

    #[test]
    fn test_missing_dir_is_file_error() {
        let err = list_polar_files(Path::new("/definitely/not/here")).unwrap_err();
        assert_eq!(err.error_code(), "FILE_ERROR");
    }

    #[test]
    fn test_reynolds_token() {
        assert_eq!(reynolds_token("E387_T1_Re0.688_M0.00"), Some("0.688"));
        assert_eq!(reynolds_token("Ref_Re0.1.txt"), Some("0.1."));
        assert_eq!(reynolds_token("plain.txt"), None);
    }

    #[test]
    fn test_list_available_re() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());
        let values = list_available_re(dir.path(), &Constants::new()).unwrap();
        assert_eq!(values, vec!["0.100", "0.688", "250000"]);
    }

    #[test]
    fn test_unreadable_file_does_not_fail_reynolds_listing() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());
        let mut files = list_polar_files(dir.path()).unwrap();
        // removed between listing and reading
        let vanished = dir.path().join("vanished.txt");
        fs::write(&vanished, " Re =  0.4 e 6 \n").unwrap();
        files.push(vanished.clone());
        fs::remove_file(&vanished).unwrap();

        let values = reynolds_values(&files, &Constants::new());
        assert_eq!(values, vec!["0.100", "0.688", "250000"]);
    }

    #[test]
    fn test_inventory_groups() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());
        let inv = inventory(dir.path()).unwrap();
        assert_eq!(inv.total_files, 5);
        assert_eq!(inv.profiles, vec!["E387", "NACA 2412", "SD7037"]);
        assert_eq!(inv.by_reynolds[0].0, "0.100");
        assert_eq!(inv.by_reynolds[0].1, vec!["NACA 2412", "SD7037"]);
        assert_eq!(inv.by_reynolds[1].1, vec!["E387", "NACA 2412"]);

        let report = inv.report();
        assert!(report.contains("Total unique profiles: 3"));
        assert!(report.contains("Reynolds Number: 0.688 (0.688e6)"));
        assert!(report.contains("  1. E387"));
        assert!(report.contains("END OF FILE"));
    }
}
