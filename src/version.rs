//! Build identity: package version plus the git state it was built from.
//!
//! `tolld` reports [`version_string`] on `/health`, and every outbound
//! request (to providers and to tolld) carries [`user_agent`].

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git branch at build time, or "unknown" outside a checkout.
pub const GIT_BRANCH: &str = match option_env!("VERGEN_GIT_BRANCH") {
    Some(branch) => branch,
    None => "unknown",
};

/// Git commit SHA at build time, or "unknown" outside a checkout.
pub const GIT_SHA: &str = match option_env!("VERGEN_GIT_SHA") {
    Some(sha) => sha,
    None => "unknown",
};

const SHORT_SHA_LEN: usize = 7;

/// Whether the working tree had uncommitted changes at build time.
pub fn git_dirty() -> bool {
    option_env!("VERGEN_GIT_DIRTY") == Some("true")
}

/// First seven characters of [`GIT_SHA`].
pub fn short_sha() -> &'static str {
    GIT_SHA.get(..SHORT_SHA_LEN).unwrap_or(GIT_SHA)
}

/// `{version}+{branch}.{sha}`, suffixed `.dirty` for uncommitted builds,
/// e.g. `0.1.0+main.abc1234`.
pub fn version_string() -> String {
    let mut version = format!("{PKG_VERSION}+{GIT_BRANCH}.{}", short_sha());
    if git_dirty() {
        version.push_str(".dirty");
    }
    version
}

/// `User-Agent` header value for outbound HTTP: `tollgate/{version_string}`.
pub fn user_agent() -> String {
    format!("tollgate/{}", version_string())
}
