//! Ordered validator execution with per-validator failure isolation.
//!
//! Validators run one after another in the order given to
//! [`ValidationPipeline::new`]. Order matters: later validators skip files
//! that earlier, more fundamental checks already flagged. A validator that
//! returns an error or panics is recorded as an
//! [`ErrorKind::InternalValidatorFailure`] against the repository root and
//! the pipeline moves on.

use super::context::{ValidationContext, ValidationError};
use super::kind::ErrorKind;
use camino::Utf8PathBuf;
use log::{debug, info, warn};
use std::error::Error as _;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

/// Source name used for errors the pipeline records on a validator's
/// behalf.
pub const PIPELINE_SOURCE: &str = "pipeline";

/// Unexpected failure of a validator, as opposed to the domain problems it
/// records in the context.
#[derive(Debug, Error)]
pub enum ValidatorFailure {
    /// Reading a file or directory failed.
    #[error("I/O error on {path}")]
    Io {
        /// Path being accessed.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A collaborator failed in a way the validator cannot classify.
    #[error("{validator} failed: {reason}")]
    Collaborator {
        /// Validator name.
        validator: &'static str,
        /// Description of the failure.
        reason: String,
    },
}

impl ValidatorFailure {
    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: impl Into<Utf8PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

/// A single independent check over the repository.
pub trait Validator {
    /// Stable validator name, recorded as the source of its errors.
    fn name(&self) -> &'static str;

    /// Run the check, recording domain problems in `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorFailure`] when the check cannot complete.
    fn validate(&self, ctx: &ValidationContext) -> Result<(), ValidatorFailure>;
}

/// Runs validators in a fixed order.
pub struct ValidationPipeline {
    validators: Vec<Box<dyn Validator>>,
}

impl ValidationPipeline {
    /// Create a pipeline that runs `validators` in the given order.
    #[must_use]
    pub fn new(validators: Vec<Box<dyn Validator>>) -> Self {
        Self { validators }
    }

    /// Names of the validators, in execution order.
    #[must_use]
    pub fn validator_names(&self) -> Vec<&'static str> {
        self.validators.iter().map(|validator| validator.name()).collect()
    }

    /// Run every validator against `ctx`.
    ///
    /// Never aborts early: a failing validator is recorded and the next one
    /// runs.
    pub fn execute(&self, ctx: &ValidationContext) {
        for validator in &self.validators {
            let name = validator.name();
            let before = ctx.error_count();
            debug!("running validator {name}");

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| validator.validate(ctx)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(failure)) => {
                    warn!("validator {name} failed: {failure}");
                    ctx.add_error(
                        ValidationError::from_error(
                            PIPELINE_SOURCE,
                            ctx.repository_root(),
                            ErrorKind::InternalValidatorFailure,
                            &failure,
                        )
                        .with_causes(prefixed_causes(name, &failure)),
                    );
                }
                Err(payload) => {
                    let reason = panic_message(payload.as_ref());
                    warn!("validator {name} panicked: {reason}");
                    ctx.add_error(ValidationError::new(
                        PIPELINE_SOURCE,
                        ctx.repository_root(),
                        ErrorKind::InternalValidatorFailure,
                        format!("validator {name} panicked: {reason}"),
                    ));
                }
            }

            let added = ctx.error_count().saturating_sub(before);
            info!("validator {name} finished with {added} new error(s)");
        }
    }
}

/// Causes for a failed validator: which validator, then the source chain.
fn prefixed_causes(name: &str, failure: &ValidatorFailure) -> Vec<String> {
    let mut causes = vec![format!("in validator {name}")];
    let mut next = failure.source();
    while let Some(cause) = next {
        causes.push(cause.to_string());
        next = cause.source();
    }
    causes
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recording {
        name: &'static str,
        calls: Rc<RefCell<Vec<&'static str>>>,
        behaviour: Behaviour,
    }

    enum Behaviour {
        Record,
        Fail,
        Panic,
        SkipFlagged,
    }

    impl Validator for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        fn validate(&self, ctx: &ValidationContext) -> Result<(), ValidatorFailure> {
            self.calls.borrow_mut().push(self.name);
            match self.behaviour {
                Behaviour::Record => {
                    ctx.add_error(ValidationError::new(
                        self.name,
                        "a.jar",
                        ErrorKind::ChecksumMismatch,
                        "bad checksum",
                    ));
                    Ok(())
                }
                Behaviour::Fail => Err(ValidatorFailure::Io {
                    path: Utf8PathBuf::from("/repo/x"),
                    source: std::io::Error::other("unreadable"),
                }),
                Behaviour::Panic => panic!("boom"),
                Behaviour::SkipFlagged => {
                    if !ctx.has_errors_for(Utf8Path::new("a.jar")) {
                        ctx.add_error(ValidationError::new(
                            self.name,
                            "a.jar",
                            ErrorKind::RemoteMismatch,
                            "remote differs",
                        ));
                    }
                    Ok(())
                }
            }
        }
    }

    fn pipeline(
        specs: Vec<(&'static str, Behaviour)>,
    ) -> (ValidationPipeline, Rc<RefCell<Vec<&'static str>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let validators = specs
            .into_iter()
            .map(|(name, behaviour)| {
                Box::new(Recording {
                    name,
                    calls: Rc::clone(&calls),
                    behaviour,
                }) as Box<dyn Validator>
            })
            .collect();
        (ValidationPipeline::new(validators), calls)
    }

    #[test]
    fn runs_validators_in_construction_order() {
        let (pipeline, calls) = pipeline(vec![
            ("first", Behaviour::Record),
            ("second", Behaviour::SkipFlagged),
        ]);
        let ctx = ValidationContext::new("/repo");

        pipeline.execute(&ctx);

        assert_eq!(*calls.borrow(), vec!["first", "second"]);
        assert_eq!(pipeline.validator_names(), vec!["first", "second"]);
        // The second validator saw the first one's error and skipped a.jar.
        assert_eq!(ctx.error_count(), 1);
    }

    #[test]
    fn failing_validator_is_recorded_and_pipeline_continues() {
        let (pipeline, calls) = pipeline(vec![
            ("broken", Behaviour::Fail),
            ("after", Behaviour::Record),
        ]);
        let ctx = ValidationContext::new("/repo");

        pipeline.execute(&ctx);

        assert_eq!(*calls.borrow(), vec!["broken", "after"]);
        let errors = ctx.errors();
        let internal = errors.first().expect("internal failure recorded");
        assert_eq!(internal.kind(), ErrorKind::InternalValidatorFailure);
        assert_eq!(internal.file(), Utf8Path::new("/repo"));
        assert_eq!(internal.source_validator(), PIPELINE_SOURCE);
        assert_eq!(
            internal.causes(),
            ["in validator broken".to_owned(), "unreadable".to_owned()]
        );
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn panicking_validator_is_recorded_and_pipeline_continues() {
        let (pipeline, calls) = pipeline(vec![
            ("explodes", Behaviour::Panic),
            ("after", Behaviour::Record),
        ]);
        let ctx = ValidationContext::new("/repo");

        pipeline.execute(&ctx);

        assert_eq!(*calls.borrow(), vec!["explodes", "after"]);
        let errors = ctx.errors();
        let internal = errors.first().expect("panic recorded");
        assert_eq!(internal.kind(), ErrorKind::InternalValidatorFailure);
        assert!(internal.message().contains("explodes"));
        assert!(internal.message().contains("boom"));
    }
}
