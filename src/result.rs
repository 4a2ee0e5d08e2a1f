use std::borrow::Cow;
use std::path::PathBuf;
use thiserror::Error;

/** Main Result type alias for tpbuild operations
 *
 * # Usage
 * ```no_run
 * use tpbuild::result::Result;
 *
 * fn read_manifest() -> Result<String> {
 *     // Function automatically propagates BuildError
 *     Ok(std::fs::read_to_string("tpbuild.toml")?)
 * }
 * ```
 */
pub type Result<T> = std::result::Result<T, BuildError>;

/** Error enumeration for the build orchestrator
 *
 * # Error Categories
 * - **Io**: File system operations
 * - **CommandFailed**: A shelled-out tool exited non-zero
 * - **UnsupportedArchive**: No extraction tool for the file suffix
 * - **Download / ChecksumMismatch**: Source archive fetching
 * - **InvalidToolset**: Unrecognized `BUILD_VS_VERSION`
 * - **Permission**: Base directory creation could not be escalated
 * - **Config / NotFound**: Configuration and lookup failures
 * - **ArchiveLayout**: Produced artifact does not contain the install directory
 */
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command `{command}` failed with exit code {code}")]
    CommandFailed {
        command: String,
        code: i32,
        output: String,
    },

    #[error("Can't extract {}: unsupported archive format", .0.display())]
    UnsupportedArchive(PathBuf),

    #[error("Download error: {0}")]
    Download(Cow<'static, str>),

    #[error("Checksum mismatch for {}: expected {expected}, got {actual}", path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Invalid value for BUILD_VS_VERSION: {0}")]
    InvalidToolset(String),

    #[error("Permission error: {0}")]
    Permission(Cow<'static, str>),

    #[error("Config error: {0}")]
    Config(Cow<'static, str>),

    #[error("Not found: {0}")]
    NotFound(Cow<'static, str>),

    #[error("Archive layout error: {0}")]
    ArchiveLayout(Cow<'static, str>),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl BuildError {
    pub const MISSING_CONFIGURE_SCRIPT: &'static str = "Configuration script does not exist";

    /** Creates a Config error with flexible message input
     *
     * # Use Cases
     * - Missing required package environment variables
     * - Invalid manifest package declarations
     * - Unreadable configuration files
     */
    pub fn config(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Config(msg.into())
    }

    pub fn not_found(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn download(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Download(msg.into())
    }

    /// Captured combined stdout/stderr of a failed command, if any.
    pub fn command_output(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { output, .. } => Some(output),
            _ => None,
        }
    }
}
