//! API token resolution.
//!
//! The bearer token can be configured in three ways, checked in order:
//!
//! 1. **Inline** - `token: "..."`, handy for local testing
//! 2. **File** - `token_file: /run/secrets/jobdesk_token`
//! 3. **Env var** - `token_env: MY_TOKEN_VAR`
//!
//! A source counts as configured when its setting is non-empty. Only the
//! first configured source is consulted.

use std::path::PathBuf;

use secrecy::SecretString;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("Failed to read API token from '{}': {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("API token variable '{0}' is not set")]
    EnvMissing(String),

    #[error("API token variable '{0}' is not valid UTF-8")]
    EnvNotUnicode(String),

    #[error("API token from {0} is blank")]
    Blank(&'static str),
}

/// Configured places to look for the API token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenSources<'a> {
    pub inline: Option<&'a str>,
    pub file: Option<&'a str>,
    pub env: Option<&'a str>,
}

impl TokenSources<'_> {
    pub fn is_configured(&self) -> bool {
        [self.inline, self.file, self.env]
            .iter()
            .any(|source| configured(*source).is_some())
    }

    /// Reads the token from the first configured source.
    ///
    /// `Ok(None)` means no source is configured. Surrounding whitespace is
    /// stripped; a token that is empty afterwards is an error.
    pub fn resolve(&self) -> Result<Option<SecretString>, SecretError> {
        if let Some(value) = configured(self.inline) {
            return non_blank(value.to_string(), "the inline setting").map(Some);
        }

        if let Some(path) = configured(self.file) {
            let path = expand_home(path);
            let content = std::fs::read_to_string(&path)
                .map_err(|source| SecretError::File { path, source })?;
            return non_blank(content, "token_file").map(Some);
        }

        if let Some(name) = configured(self.env) {
            let value = std::env::var(name).map_err(|e| match e {
                std::env::VarError::NotPresent => SecretError::EnvMissing(name.to_string()),
                std::env::VarError::NotUnicode(_) => SecretError::EnvNotUnicode(name.to_string()),
            })?;
            return non_blank(value, "token_env").map(Some);
        }

        Ok(None)
    }
}

fn configured(source: Option<&str>) -> Option<&str> {
    source.map(str::trim).filter(|s| !s.is_empty())
}

fn non_blank(value: String, origin: &'static str) -> Result<SecretString, SecretError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SecretError::Blank(origin));
    }
    Ok(SecretString::from(trimmed.to_string()))
}

/// Expands a leading `~` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match dirs::home_dir() {
            Some(home) => home.join(rest.trim_start_matches('/')),
            None => PathBuf::from(path),
        },
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn resolve(sources: TokenSources<'_>) -> Option<String> {
        sources
            .resolve()
            .unwrap()
            .map(|token| token.expose_secret().to_string())
    }

    #[test]
    fn test_inline_token_wins() {
        let sources = TokenSources {
            inline: Some("inline-token"),
            file: Some("/nonexistent"),
            env: Some("UNSET_VAR"),
        };
        assert_eq!(resolve(sources).as_deref(), Some("inline-token"));
    }

    #[test]
    fn test_file_token_is_trimmed() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "  file-token  ").unwrap();

        let sources = TokenSources {
            file: file.path().to_str(),
            env: Some("UNSET"),
            ..Default::default()
        };
        assert_eq!(resolve(sources).as_deref(), Some("file-token"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let sources = TokenSources {
            file: Some("/nonexistent/jobdesk/token"),
            ..Default::default()
        };
        assert!(matches!(sources.resolve(), Err(SecretError::File { .. })));
    }

    #[test]
    fn test_blank_file_is_an_error() {
        let file = NamedTempFile::new().unwrap();
        let sources = TokenSources {
            file: file.path().to_str(),
            ..Default::default()
        };
        assert!(matches!(
            sources.resolve(),
            Err(SecretError::Blank("token_file"))
        ));
    }

    #[test]
    #[serial]
    fn test_env_token() {
        std::env::set_var("JOBDESK_TEST_TOKEN", "env-token\n");
        let sources = TokenSources {
            env: Some("JOBDESK_TEST_TOKEN"),
            ..Default::default()
        };
        assert_eq!(resolve(sources).as_deref(), Some("env-token"));
        std::env::remove_var("JOBDESK_TEST_TOKEN");

        assert!(matches!(
            sources.resolve(),
            Err(SecretError::EnvMissing(name)) if name == "JOBDESK_TEST_TOKEN"
        ));
    }

    #[test]
    fn test_unconfigured_is_none() {
        let sources = TokenSources {
            inline: Some(""),
            file: Some("  "),
            env: None,
        };
        assert!(!sources.is_configured());
        assert!(resolve(sources).is_none());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/etc/token"), PathBuf::from("/etc/token"));
        assert_eq!(expand_home("~other/token"), PathBuf::from("~other/token"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/.jobdesk/token"), home.join(".jobdesk/token"));
        }
    }
}
