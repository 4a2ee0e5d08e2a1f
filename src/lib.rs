/// tpbuild - third-party library build orchestration
///
/// Fetches source archives, runs each library's own build tools with a
/// controlled environment, installs into a canonical toolbase layout and
/// packs the result for CI artifact staging.
///
/// Main modules:
/// - build: Host platform, directory layout and the shared build context
/// - cli: Command-line interface parsing
/// - commands: Implementation of the subcommands
/// - config: Environment snapshot and configuration file
/// - package: Package trait, recipes and the build pipeline
/// - packages: Built-in and manifest package definitions
/// - result: Error handling and result types
/// - utils: Process execution and text patching helpers
pub mod build;
pub mod cli;
pub mod commands;
pub mod config;
pub mod package;
pub mod packages;
pub mod result;
pub mod utils;
