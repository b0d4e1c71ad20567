use std::fmt;

/// Failure class attached to an `anyhow::Error` as context.
///
/// Callers recover the class with `err.downcast_ref::<Fault>()`; the
/// underlying cause stays in the error chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Camera could not be opened or a frame could not be read.
    Acquisition,
    /// The classifier failed on a frame.
    Inference,
    /// Startup configuration is invalid.
    Configuration,
    /// The inventory store could not be read or written.
    Inventory,
    /// The live preview could not be drawn.
    Display,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Fault::Acquisition => "camera acquisition failed",
            Fault::Inference => "inference failed",
            Fault::Configuration => "invalid configuration",
            Fault::Inventory => "inventory store failed",
            Fault::Display => "preview failed",
        };
        f.write_str(msg)
    }
}

impl Fault {
    /// Returns the fault class recorded anywhere in the error chain.
    pub fn of(err: &anyhow::Error) -> Option<Fault> {
        err.downcast_ref::<Fault>().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    #[test]
    fn fault_survives_further_context() {
        let err = Err::<(), _>(anyhow!("device busy"))
            .context(Fault::Acquisition)
            .context("scanner loop stopped")
            .unwrap_err();
        assert_eq!(Fault::of(&err), Some(Fault::Acquisition));
        assert!(format!("{:#}", err).contains("device busy"));
    }

    #[test]
    fn plain_errors_have_no_fault() {
        let err = anyhow!("plain");
        assert_eq!(Fault::of(&err), None);
    }
}
