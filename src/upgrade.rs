//! Self-upgrade from the latest GitHub release.

use anyhow::{anyhow, bail, Context, Result};
use semver::Version;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::debug;

const RELEASE_REPO: &str = "fulll/github-code-search";
const ASSET_PREFIX: &str = "github-code-search";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

#[derive(Debug, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// Release-asset platform name for a Rust target OS.
pub fn platform_name(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

/// Release-asset arch name for a Rust target arch.
pub fn arch_name(arch: &str) -> &str {
    match arch {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        other => other,
    }
}

fn parse_version(v: &str) -> Option<Version> {
    Version::parse(v.trim().trim_start_matches('v')).ok()
}

/// Strictly newer per semver; anything unparsable is never newer.
pub fn is_newer_version(current: &str, latest: &str) -> bool {
    match (parse_version(current), parse_version(latest)) {
        (Some(c), Some(l)) => l > c,
        _ => false,
    }
}

/// Exact-name match on `github-code-search-<platform>-<arch>[.exe]`.
pub fn select_asset<'a>(assets: &'a [ReleaseAsset], platform: &str, arch: &str) -> Option<&'a ReleaseAsset> {
    let suffix = if platform == "win32" { ".exe" } else { "" };
    let name = format!("{}-{}-{}{}", ASSET_PREFIX, platform, arch, suffix);
    assets.iter().find(|a| a.name == name)
}

pub fn fetch_latest_release(base_url: &str, token: Option<&str>) -> Result<Release> {
    let url = format!(
        "{}/repos/{}/releases/latest",
        base_url.trim_end_matches('/'),
        RELEASE_REPO
    );
    let mut req = ureq::get(&url)
        .set("Accept", "application/vnd.github+json")
        .set("X-GitHub-Api-Version", "2022-11-28")
        .set("User-Agent", concat!("github-code-search/", env!("CARGO_PKG_VERSION")));
    if let Some(token) = token {
        req = req.set("Authorization", &format!("Bearer {}", token));
    }
    let res = match req.call() {
        Ok(res) => res,
        Err(ureq::Error::Status(status, res)) => {
            let body = res.into_string().unwrap_or_default();
            bail!("GitHub API error {}: {}", status, body);
        }
        Err(e) => bail!("failed to fetch latest release: {}", e),
    };
    res.into_json::<Release>()
        .context("failed to parse release metadata")
}

/// Download to `<dest>.tmp`, make it executable and rename over `dest`.
fn download_binary(url: &str, dest: &Path) -> Result<()> {
    let res = ureq::get(url)
        .call()
        .map_err(|e| anyhow!("download failed ({}): {}", e, url))?;
    let mut data = Vec::new();
    res.into_reader()
        .read_to_end(&mut data)
        .context("failed to read download")?;

    let mut tmp = dest.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);
    std::fs::write(&tmp, &data).with_context(|| format!("failed to write {}", tmp.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o755))
            .context("failed to make binary executable")?;
    }

    std::fs::rename(&tmp, dest).with_context(|| format!("failed to replace {}", dest.display()))?;
    debug!(bytes = data.len(), dest = %dest.display(), "binary replaced");
    Ok(())
}

/// Check for a newer release and replace `exe_path` with it.
pub fn perform_upgrade(current_version: &str, exe_path: &Path, base_url: &str, token: Option<&str>) -> Result<()> {
    println!("Checking for updates…");
    let release = fetch_latest_release(base_url, token)?;
    let latest = release.tag_name.as_str();

    if !is_newer_version(current_version, latest) {
        println!("Already up to date ({}).", current_version);
        return Ok(());
    }

    let platform = platform_name(std::env::consts::OS);
    let arch = arch_name(std::env::consts::ARCH);
    let Some(asset) = select_asset(&release.assets, platform, arch) else {
        bail!(
            "No binary found for platform {}/{} in release {}.",
            platform,
            arch,
            latest
        );
    };

    println!("Upgrading {} → {}…", current_version, latest);
    download_binary(&asset.browser_download_url, exe_path)?;
    println!("Successfully upgraded to {}.", latest);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str) -> ReleaseAsset {
        ReleaseAsset {
            name: name.into(),
            browser_download_url: format!("https://example.invalid/{}", name),
        }
    }

    #[test]
    fn newer_version_comparison() {
        assert!(is_newer_version("1.2.3", "v1.2.4"));
        assert!(is_newer_version("v1.2.3", "1.10.0"));
        assert!(!is_newer_version("1.2.3", "1.2.3"));
        assert!(!is_newer_version("2.0.0", "1.9.9"));
    }

    #[test]
    fn unparsable_versions_are_never_newer() {
        assert!(!is_newer_version("dev", "1.0.0"));
        assert!(!is_newer_version("1.0.0", "latest"));
    }

    #[test]
    fn asset_selection_by_exact_name() {
        let assets = vec![
            asset("github-code-search-darwin-arm64"),
            asset("github-code-search-linux-x64"),
            asset("github-code-search-win32-x64.exe"),
        ];
        assert_eq!(
            select_asset(&assets, "linux", "x64").map(|a| a.name.as_str()),
            Some("github-code-search-linux-x64")
        );
        assert_eq!(
            select_asset(&assets, "win32", "x64").map(|a| a.name.as_str()),
            Some("github-code-search-win32-x64.exe")
        );
        assert!(select_asset(&assets, "linux", "arm64").is_none());
    }

    #[test]
    fn rust_target_names_map_to_release_names() {
        assert_eq!(platform_name("macos"), "darwin");
        assert_eq!(platform_name("windows"), "win32");
        assert_eq!(platform_name("linux"), "linux");
        assert_eq!(arch_name("x86_64"), "x64");
        assert_eq!(arch_name("aarch64"), "arm64");
    }

    #[test]
    fn release_json_parses() {
        let json = r#"{"tag_name":"v1.5.0","assets":[{"name":"github-code-search-linux-x64","browser_download_url":"https://x/y"}]}"#;
        let release: Release = serde_json::from_str(json).unwrap();
        assert_eq!(release.tag_name, "v1.5.0");
        assert_eq!(release.assets.len(), 1);
    }
}
