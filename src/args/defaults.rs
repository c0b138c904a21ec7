/// Directory searched for `<id>.json` / `<id>.toml` suites.
pub(crate) const DEFAULT_SUITES_DIR: &str = "./suites";
/// Directory run artifacts are written to.
pub(crate) const DEFAULT_ARTIFACTS_DIR: &str = "./artifacts";
/// Per-request timeout.
pub(crate) const DEFAULT_TIMEOUT: &str = "30s";
