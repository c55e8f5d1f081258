use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use claims_cache::{CacheKey, Claims, ClaimsCache, ClaimsCacheConfig, Clock, ManualClock};
use serde_json::json;

use crate::cli::{CheckConfigArgs, DigestArgs, SimulateArgs};
use crate::output::{print_field, print_success, print_warning};

pub fn digest(args: &DigestArgs) -> Result<()> {
    let credential = read_credential(args.credential.as_deref(), std::io::stdin())?;

    let key = CacheKey::derive(&credential);
    if args.short {
        println!("{}", key.short());
    } else {
        println!("{key}");
    }
    Ok(())
}

/// Take the credential from the argument, or from `input` when absent.
fn read_credential(arg: Option<&str>, mut input: impl Read) -> Result<String> {
    let credential = match arg {
        Some(c) => c.to_string(),
        None => {
            let mut buf = String::new();
            input
                .read_to_string(&mut buf)
                .context("Failed to read credential from stdin")?;
            buf.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    if credential.is_empty() {
        bail!("Credential is empty");
    }
    Ok(credential)
}

pub fn check_config(args: &CheckConfigArgs) -> Result<()> {
    let config = ClaimsCacheConfig::load(&args.path)
        .with_context(|| format!("Invalid configuration in {}", args.path.display()))?;

    print_success(&format!("{} is valid", args.path.display()));
    print_config(&config);
    Ok(())
}

/// Outcome of inserting a sample credential into a fresh cache.
#[derive(Debug)]
struct Simulation {
    max_ttl: std::time::Duration,
    lifetime: time::Duration,
    /// `None` when the insert was declined.
    cached_for: Option<time::Duration>,
}

impl Simulation {
    fn is_clamped(&self) -> bool {
        self.cached_for.is_some_and(|ttl| ttl < self.lifetime)
    }
}

pub fn simulate(args: &SimulateArgs) -> Result<()> {
    let sim = run_simulation(args)?;

    print_field("max_ttl", humantime::format_duration(sim.max_ttl));
    print_field("credential lifetime", format_signed(sim.lifetime));

    match sim.cached_for {
        Some(ttl) => {
            print_field("cached for", format_signed(ttl));
            if sim.is_clamped() {
                print_warning("lifetime clamped to max_ttl; revalidation happens earlier");
            }
        }
        None => print_warning("not cached: credential has no remaining lifetime"),
    }

    Ok(())
}

fn run_simulation(args: &SimulateArgs) -> Result<Simulation> {
    let mut config = match &args.config {
        Some(path) => ClaimsCacheConfig::load(path)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?,
        None => ClaimsCacheConfig::default(),
    };
    if let Some(max_ttl) = args.max_ttl {
        config.max_ttl = max_ttl;
    }
    config.validate()?;

    let lifetime = time::Duration::try_from(args.expires_in)
        .context("--expires-in is out of range")?;
    let lifetime = if args.expired { -lifetime } else { lifetime };

    let clock = Arc::new(ManualClock::starting_now());
    let now = clock.now();
    let expires_at = now
        .checked_add(lifetime)
        .context("--expires-in is out of range")?;

    let cache: ClaimsCache = ClaimsCache::from_config(&config).with_clock(clock.clone());

    let credential = "simulated-credential";
    let mut claims = Claims::new();
    claims.insert("sub".to_string(), json!("simulated"));
    cache.insert(credential, expires_at, claims);

    Ok(Simulation {
        max_ttl: config.max_ttl,
        lifetime,
        cached_for: cache.expires_at(credential).map(|at| at - now),
    })
}

fn print_config(config: &ClaimsCacheConfig) {
    print_field("max_ttl", humantime::format_duration(config.max_ttl));
    print_field("sweep_enabled", config.sweep_enabled);
    print_field(
        "sweep_interval",
        humantime::format_duration(config.sweep_interval),
    );
    print_field("initial_capacity", config.initial_capacity);
}

fn format_signed(d: time::Duration) -> String {
    let formatted = humantime::format_duration(d.unsigned_abs()).to_string();
    if d.is_negative() {
        format!("-{formatted}")
    } else {
        formatted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::time::Duration;

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn simulate_args(expires_in: &str) -> SimulateArgs {
        SimulateArgs {
            expires_in: humantime::parse_duration(expires_in).unwrap(),
            expired: false,
            max_ttl: None,
            config: None,
        }
    }

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{contents}").unwrap();
        file
    }

    // -------------------------------------------------------------------------
    // digest
    // -------------------------------------------------------------------------

    #[test]
    fn test_read_credential_from_argument() {
        let credential = read_credential(Some("abc"), std::io::empty()).unwrap();
        assert_eq!(credential, "abc");
    }

    #[test]
    fn test_read_credential_from_input_strips_newline() {
        let credential = read_credential(None, "token-from-pipe\r\n".as_bytes()).unwrap();
        assert_eq!(credential, "token-from-pipe");
    }

    #[test]
    fn test_empty_credential_rejected() {
        assert!(read_credential(Some(""), std::io::empty()).is_err());
        assert!(read_credential(None, "\n".as_bytes()).is_err());

        let args = DigestArgs {
            credential: Some(String::new()),
            short: false,
        };
        let err = digest(&args).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_digest_succeeds() {
        let args = DigestArgs {
            credential: Some("abc".to_string()),
            short: true,
        };
        assert!(digest(&args).is_ok());
    }

    // -------------------------------------------------------------------------
    // check-config
    // -------------------------------------------------------------------------

    #[test]
    fn test_check_config_valid_file() {
        let file = config_file("[claims_cache]\nmax_ttl = \"2m\"\n");
        let args = CheckConfigArgs {
            path: file.path().to_path_buf(),
        };
        assert!(check_config(&args).is_ok());
    }

    #[test]
    fn test_check_config_invalid_file() {
        let file = config_file("[claims_cache]\nmax_ttl = \"0s\"\n");
        let args = CheckConfigArgs {
            path: file.path().to_path_buf(),
        };
        let err = check_config(&args).unwrap_err();
        assert!(format!("{err:#}").contains("max_ttl must be > 0"));
    }

    #[test]
    fn test_check_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let args = CheckConfigArgs {
            path: dir.path().join("missing.toml"),
        };
        assert!(check_config(&args).is_err());
    }

    // -------------------------------------------------------------------------
    // simulate
    // -------------------------------------------------------------------------

    #[test]
    fn test_simulate_clamps_to_default_max_ttl() {
        let sim = run_simulation(&simulate_args("2h")).unwrap();

        assert_eq!(sim.max_ttl, Duration::from_secs(300));
        assert_eq!(sim.lifetime, time::Duration::hours(2));
        assert_eq!(sim.cached_for, Some(time::Duration::minutes(5)));
        assert!(sim.is_clamped());
    }

    #[test]
    fn test_simulate_short_lifetime_not_clamped() {
        let sim = run_simulation(&simulate_args("30s")).unwrap();

        assert_eq!(sim.cached_for, Some(time::Duration::seconds(30)));
        assert!(!sim.is_clamped());
    }

    #[test]
    fn test_simulate_expired_credential_not_cached() {
        let args = SimulateArgs {
            expired: true,
            ..simulate_args("5s")
        };
        let sim = run_simulation(&args).unwrap();

        assert_eq!(sim.lifetime, time::Duration::seconds(-5));
        assert_eq!(sim.cached_for, None);
        assert!(!sim.is_clamped());
        assert!(simulate(&args).is_ok());
    }

    #[test]
    fn test_simulate_max_ttl_override() {
        let args = SimulateArgs {
            max_ttl: Some(Duration::from_secs(60)),
            ..simulate_args("10m")
        };
        let sim = run_simulation(&args).unwrap();

        assert_eq!(sim.max_ttl, Duration::from_secs(60));
        assert_eq!(sim.cached_for, Some(time::Duration::minutes(1)));
    }

    #[test]
    fn test_simulate_zero_max_ttl_rejected() {
        let args = SimulateArgs {
            max_ttl: Some(Duration::ZERO),
            ..simulate_args("10m")
        };
        assert!(run_simulation(&args).is_err());
    }

    #[test]
    fn test_simulate_max_ttl_from_config_file() {
        let file = config_file("[claims_cache]\nmax_ttl = \"90s\"\n");
        let args = SimulateArgs {
            config: Some(PathBuf::from(file.path())),
            ..simulate_args("1h")
        };
        let sim = run_simulation(&args).unwrap();

        assert_eq!(sim.cached_for, Some(time::Duration::seconds(90)));
    }

    #[test]
    fn test_simulate_lifetime_beyond_calendar_is_error() {
        let err = run_simulation(&simulate_args("20000years")).unwrap_err();
        assert!(err.to_string().contains("--expires-in is out of range"));

        let args = SimulateArgs {
            expired: true,
            ..simulate_args("20000years")
        };
        assert!(simulate(&args).is_err());
    }

    #[test]
    fn test_format_signed() {
        assert_eq!(format_signed(time::Duration::minutes(5)), "5m");
        assert_eq!(format_signed(time::Duration::seconds(-90)), "-1m 30s");
        assert_eq!(format_signed(time::Duration::ZERO), "0s");
    }
}
