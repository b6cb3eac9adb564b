//! Well-known variables read by the built-in tasks

use super::registry::{EnvVarDescriptor, EnvironmentRegistry};

pub const BUILD_CONFIGURATION: &str = "BUILD_CONFIGURATION";
pub const BUILD_VERBOSITY: &str = "BUILD_VERBOSITY";
pub const BUILD_INCLUDE: &str = "BUILD_INCLUDE";
pub const TEST_CONFIGURATION: &str = "TEST_CONFIGURATION";
pub const TEST_VERBOSITY: &str = "TEST_VERBOSITY";
pub const TEST_INCLUDE: &str = "TEST_INCLUDE";
pub const PACK_INCLUDE: &str = "PACK_INCLUDE";
pub const PACK_TARGET_FOLDER: &str = "PACK_TARGET_FOLDER";
pub const NUGET_API_KEY: &str = "NUGET_API_KEY";
pub const NUGET_PUSH_SOURCE: &str = "NUGET_PUSH_SOURCE";
pub const NUGET_SOURCE: &str = "NUGET_SOURCE";
pub const GIT_TAG: &str = "GIT_TAG";
pub const GIT_REMOTE: &str = "GIT_REMOTE";
pub const DOTNET_CLI: &str = "DOTNET_CLI";
pub const DRY_RUN: &str = "DRY_RUN";
pub const MAX_CONCURRENCY: &str = "MAX_CONCURRENCY";
pub const ZARRO_SKIP_NPM_TASKS: &str = "ZARRO_SKIP_NPM_TASKS";
pub const ZARRO_PRIORITY_TESTS: &str = "ZARRO_PRIORITY_TESTS";
pub const ZARRO_DEBUG: &str = "ZARRO_DEBUG";
pub const DEBUG: &str = "DEBUG";

/// Descriptors for every well-known variable
pub fn descriptors() -> Vec<EnvVarDescriptor> {
    vec![
        EnvVarDescriptor::new(BUILD_CONFIGURATION)
            .with_default("Release")
            .with_help("Configuration passed to dotnet build, clean and pack"),
        EnvVarDescriptor::new(BUILD_VERBOSITY)
            .with_default("minimal")
            .with_help("Verbosity passed to dotnet build"),
        EnvVarDescriptor::new(BUILD_INCLUDE)
            .with_default("*.sln")
            .with_help("Comma-separated globs selecting what to build"),
        EnvVarDescriptor::new(TEST_CONFIGURATION)
            .with_default("Release")
            .with_help("Configuration passed to dotnet test; should match the build"),
        EnvVarDescriptor::new(TEST_VERBOSITY)
            .with_default("normal")
            .with_help("Verbosity passed to dotnet test"),
        EnvVarDescriptor::new(TEST_INCLUDE)
            .with_default("**/*.Tests.csproj")
            .with_help("Comma-separated globs selecting test projects"),
        EnvVarDescriptor::new(PACK_INCLUDE)
            .with_default("src/**/*.csproj")
            .with_help("Comma-separated globs selecting projects to pack"),
        EnvVarDescriptor::new(PACK_TARGET_FOLDER)
            .with_default("packages")
            .with_help("Folder that receives packed .nupkg files"),
        EnvVarDescriptor::new(NUGET_API_KEY).with_help("API key used when pushing packages"),
        EnvVarDescriptor::new(NUGET_PUSH_SOURCE)
            .with_help("Source to push packages to (falls back to NUGET_SOURCE)"),
        EnvVarDescriptor::new(NUGET_SOURCE)
            .with_default("nuget.org")
            .with_help("Default NuGet source"),
        EnvVarDescriptor::new(GIT_TAG).with_help("Tag to create, eg v1.2.3"),
        EnvVarDescriptor::new(GIT_REMOTE)
            .with_default("origin")
            .with_help("Remote that tags are pushed to"),
        EnvVarDescriptor::new(DOTNET_CLI)
            .with_default("dotnet")
            .with_help("Path to the dotnet executable"),
        EnvVarDescriptor::new(DRY_RUN)
            .with_help("Print the commands tasks would run instead of running them"),
        EnvVarDescriptor::new(MAX_CONCURRENCY)
            .with_default("1")
            .with_help("Maximum number of independent tasks run at once"),
        EnvVarDescriptor::new(ZARRO_SKIP_NPM_TASKS)
            .with_help("Do not import package.json scripts as tasks"),
        EnvVarDescriptor::new(ZARRO_PRIORITY_TESTS)
            .with_help("Comma-separated test names that always run first"),
        EnvVarDescriptor::new(ZARRO_DEBUG)
            .with_help("Show full error details for unexpected failures"),
        EnvVarDescriptor::new(DEBUG).with_help("Alias of ZARRO_DEBUG"),
        EnvVarDescriptor::new(super::RUNNING_MARKER)
            .with_help("Set by zarro for every command it runs; disables package.json import"),
    ]
}

/// Register every well-known variable
pub fn register_known(registry: &EnvironmentRegistry) {
    for descriptor in descriptors() {
        registry.register(descriptor);
    }
}
