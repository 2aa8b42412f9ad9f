use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PathError {
    #[error("path {} contains non-ASCII component {component:?} (first offending character {character:?})", .path.display())]
    NonAsciiPath {
        path: PathBuf,
        component: String,
        character: char,
    },
}

fn is_printable_ascii(c: char) -> bool {
    matches!(c, ' '..='~')
}

/// Fails when any component of `path` holds a character outside printable
/// ASCII. Non-UTF-8 components fail too, through their replacement character.
pub fn validate_path(path: &Path) -> Result<(), PathError> {
    for component in path.components() {
        let part = match component {
            Component::Normal(part) => part.to_string_lossy(),
            Component::Prefix(prefix) => prefix.as_os_str().to_string_lossy(),
            Component::RootDir | Component::CurDir | Component::ParentDir => continue,
        };

        if let Some(character) = part.chars().find(|c| !is_printable_ascii(*c)) {
            return Err(PathError::NonAsciiPath {
                path: path.to_path_buf(),
                component: part.into_owned(),
                character,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn ascii_path_passes() {
        assert!(validate_path(Path::new("/home/user/Desktop/discord-bot")).is_ok());
        assert!(validate_path(Path::new("./my bot/main.py")).is_ok());
        assert!(validate_path(Path::new("")).is_ok());
    }

    #[test]
    fn japanese_folder_name_fails() {
        let err = validate_path(Path::new("/home/user/デスクトップ/bot")).unwrap_err();
        let PathError::NonAsciiPath {
            component,
            character,
            ..
        } = err;
        assert_eq!(component, "デスクトップ");
        assert_eq!(character, 'デ');
    }

    #[test]
    fn control_character_fails() {
        assert!(validate_path(Path::new("bot\tfolder")).is_err());
        assert!(validate_path(Path::new("bot\u{7f}")).is_err());
    }

    #[test]
    fn repeated_validation_agrees() {
        let path = Path::new("/srv/ボット");
        assert_eq!(validate_path(path), validate_path(path));
    }

    proptest! {
        #[test]
        fn printable_ascii_segments_always_pass(segments in prop::collection::vec("[ -.0-~]{1,12}", 1..6)) {
            let path: PathBuf = segments.iter().collect();
            prop_assert!(validate_path(&path).is_ok());
        }

        #[test]
        fn any_non_ascii_character_fails(
            prefix in "[a-z]{0,8}",
            bad in any::<char>().prop_filter("non-ascii", |c| !c.is_ascii()),
            suffix in "[a-z]{0,8}",
        ) {
            let path = PathBuf::from(format!("root/{prefix}{bad}{suffix}/main.py"));
            let is_non_ascii = matches!(
                validate_path(&path),
                Err(PathError::NonAsciiPath { .. })
            );
            prop_assert!(is_non_ascii);
        }
    }
}
