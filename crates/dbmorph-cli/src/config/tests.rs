use super::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[cfg(test)]
mod parse_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = DbmorphConfig::from_toml("").unwrap();
        assert_eq!(config, DbmorphConfig::default());
        assert!(config.compare.include_tables);
        assert!(!config.compare.destructive);
        assert!(config.compare.case_sensitive);
        assert!(config.migration.use_if_exists);
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = DbmorphConfig::from_toml(
            r#"
            [compare]
            destructive = true
            include_triggers = false
            empty_tables = ["audit_log"]

            [logging]
            json = true
            "#,
        )
        .unwrap();

        assert!(config.compare.destructive);
        assert!(!config.compare.include_triggers);
        assert!(config.compare.include_views);
        assert_eq!(config.compare.empty_tables, vec!["audit_log".to_string()]);
        assert!(config.logging.json);
        assert_eq!(config.logging.filter, "warn");
        assert_eq!(config.migration, MigrationSettings::default());
    }

    #[test]
    fn test_wrong_type_is_an_error() {
        let err = DbmorphConfig::from_toml("[compare]\ndestructive = \"yes\"").unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid dbmorph configuration"));
    }
}

#[cfg(test)]
mod load_tests {
    use super::*;

    #[test]
    fn test_load_explicit_file() {
        let file = config_file("[migration]\ninclude_comments = false\n");
        let config = DbmorphConfig::load(Some(file.path())).unwrap();
        assert!(!config.migration.include_comments);
        assert!(config.migration.use_if_exists);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = DbmorphConfig::load(Some(&path)).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read config"));
    }

    #[test]
    fn test_load_reports_parse_errors_with_path() {
        let file = config_file("[compare\n");
        let err = DbmorphConfig::load_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}

#[cfg(test)]
mod conversion_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_compare_settings_to_options() {
        let settings = CompareSettings {
            include_views: false,
            destructive: true,
            case_sensitive: false,
            empty_tables: vec!["staging".to_string(), "scratch".to_string()],
            ..Default::default()
        };
        let options = settings.to_options();

        assert!(options.include_tables);
        assert!(!options.include_views);
        assert!(options.destructive);
        assert!(!options.case_sensitive);
        assert!(options.empty_tables.contains("staging"));
        assert!(options.empty_tables.contains("scratch"));
    }

    #[test]
    fn test_compare_settings_to_extract_options() {
        let settings = CompareSettings {
            include_procedures: false,
            ..Default::default()
        };
        let extract = settings.to_extract_options();
        assert_eq!(extract, ExtractOptions::new().without_procedures());
    }

    #[test]
    fn test_migration_settings_to_config() {
        let settings = MigrationSettings {
            use_if_exists: false,
            include_comments: true,
        };
        assert_eq!(
            settings.to_config(),
            MigrationConfig::new().with_if_exists(false)
        );
    }
}
