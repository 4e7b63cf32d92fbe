//! Exit codes for the CLI

use migration_hooks_core::HooksError;

/// Success
#[allow(dead_code)]
pub const SUCCESS: i32 = 0;

/// General error
pub const ERROR: i32 = 1;

/// Configuration error
pub const CONFIG_ERROR: i32 = 2;

/// A hook failed and halted the run
pub const HOOK_ERROR: i32 = 3;

/// Scaffolding or coverage error (missing migration, existing hook file, ...)
pub const SCAFFOLD_ERROR: i32 = 4;

/// User cancelled
pub const CANCELLED: i32 = 130;

/// Exit code for an error returned by a command
pub fn for_error(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<HooksError>() {
        return match e {
            HooksError::Config(_) | HooksError::Toml(_) | HooksError::Yaml(_) => CONFIG_ERROR,
            HooksError::Dispatch(_) => HOOK_ERROR,
            HooksError::Scaffold(_) => SCAFFOLD_ERROR,
            HooksError::Io(_) | HooksError::Other(_) => ERROR,
        };
    }
    if let Some(dialoguer::Error::IO(e)) = err.downcast_ref::<dialoguer::Error>() {
        if e.kind() == std::io::ErrorKind::Interrupted {
            return CANCELLED;
        }
    }
    ERROR
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration_hooks_core::{DispatchError, ScaffoldError};

    #[test]
    fn test_error_mapping() {
        let halted: anyhow::Error = HooksError::from(DispatchError::RegistryCallback {
            event: "all_ended".to_string(),
            message: "boom".to_string(),
        })
        .into();
        assert_eq!(for_error(&halted), HOOK_ERROR);

        let exists: anyhow::Error =
            HooksError::from(ScaffoldError::AlreadyExists("hooks/x.toml".into())).into();
        assert_eq!(for_error(&exists), SCAFFOLD_ERROR);

        assert_eq!(for_error(&anyhow::anyhow!("anything else")), ERROR);
    }
}
