use crate::config::{DEFAULT_APP_FOLDER, DEFAULT_CONFIG_DIR, EditableField};
use crate::release::DEFAULT_API_URL;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "appimage-updater",
    version,
    about = "Track, download, verify and update AppImages published as GitHub release assets."
)]
pub struct Args {
    #[arg(
        long,
        global = true,
        env = "APPIMAGE_UPDATER_CONFIG_DIR",
        default_value = DEFAULT_CONFIG_DIR,
        help = "Directory holding one <repo>.json record per tracked application"
    )]
    pub config_dir: PathBuf,
    #[arg(
        long,
        global = true,
        env = "APPIMAGE_UPDATER_APP_FOLDER",
        default_value = DEFAULT_APP_FOLDER,
        help = "Application folder holding versions.json"
    )]
    pub app_folder: String,
    #[arg(
        long,
        global = true,
        env = "APPIMAGE_UPDATER_API_URL",
        default_value = DEFAULT_API_URL,
        hide = true
    )]
    pub api_url: String,
    #[arg(short, long, global = true, help = "Enable debug logging")]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Track a new application and install its latest AppImage
    Setup,
    /// List tracked applications
    List,
    /// Download and install the latest AppImage of a tracked application
    Install {
        /// Repository name; prompts when omitted and several are tracked
        repo: Option<String>,
    },
    /// Check every tracked application for a newer release
    Check {
        #[arg(long, help = "Install every outdated application")]
        install: bool,
        #[arg(long, value_enum, help = "Also write the report as json or csv")]
        format: Option<ReportFormat>,
        #[arg(long, default_value = "appimage-report", help = "Report file name prefix")]
        output: String,
    },
    /// Edit a stored record field
    Edit {
        repo: String,
        #[arg(value_enum)]
        field: Option<EditableField>,
        value: Option<String>,
    },
    /// Compare versions.json against the config records without writing
    Reconcile,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ReportFormat {
    Json,
    Csv,
}

pub fn parse_args() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_flags() {
        let args = Args::try_parse_from(["appimage-updater", "list"]).unwrap();
        assert_eq!(args.config_dir, PathBuf::from("config_files/"));
        assert_eq!(args.app_folder, "~/Documents/appimages");
        assert!(matches!(args.command, Command::List));
    }

    #[test]
    fn edit_parses_field_and_value() {
        let argv = ["appimage-updater", "edit", "joplin", "folder-backup", "/srv/backup"];
        let args = Args::try_parse_from(argv).unwrap();
        match args.command {
            Command::Edit { repo, field, value } => {
                assert_eq!(repo, "joplin");
                assert_eq!(field, Some(EditableField::FolderBackup));
                assert_eq!(value.as_deref(), Some("/srv/backup"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn check_accepts_report_format() {
        let argv = ["appimage-updater", "check", "--install", "--format", "csv"];
        let args = Args::try_parse_from(argv).unwrap();
        assert!(matches!(
            args.command,
            Command::Check {
                install: true,
                format: Some(ReportFormat::Csv),
                ..
            }
        ));
    }
}
