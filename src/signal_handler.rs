use anyhow::Result; // Importing Result type from anyhow for error handling
use log::info; // Importing logging macro for info messages
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex}; // Importing Arc for thread-safe reference counting

/// Shared flag raised when the user asks the run to stop
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ctrlc accepts one handler per process; later runs only swap the flag it raises
static HANDLER_INSTALLED: AtomicBool = AtomicBool::new(false);
static ACTIVE_FLAG: Mutex<Option<ShutdownFlag>> = Mutex::new(None);

// Struct to handle OS signals and forward them to the shutdown flag
pub struct SignalHandler {
    shutdown: ShutdownFlag,
}

impl SignalHandler {
    // Function to create a new instance of SignalHandler
    pub fn new(shutdown: ShutdownFlag) -> Self {
        Self { shutdown }
    }

    // Function to set up signal handlers
    pub fn setup_handlers(&self) -> Result<()> {
        if let Ok(mut active) = ACTIVE_FLAG.lock() {
            *active = Some(self.shutdown.clone());
        }

        if HANDLER_INSTALLED.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        // Set up a handler for the Ctrl+C signal
        let installed = ctrlc::set_handler(|| {
            // The merge loop only looks at the flag between files
            info!("Received interrupt signal, stopping after the current file");
            if let Ok(active) = ACTIVE_FLAG.lock() {
                if let Some(flag) = active.as_ref() {
                    flag.request();
                }
            }
        });
        if let Err(e) = installed {
            HANDLER_INSTALLED.store(false, Ordering::SeqCst);
            return Err(e.into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_is_shared_between_clones() {
        let flag = ShutdownFlag::new();
        let observer = flag.clone();
        assert!(!observer.is_requested());

        flag.request();
        assert!(observer.is_requested());
    }

    #[test]
    fn test_handlers_can_be_set_up_for_each_run() {
        let first = ShutdownFlag::new();
        let second = ShutdownFlag::new();
        assert!(SignalHandler::new(first).setup_handlers().is_ok());
        assert!(SignalHandler::new(second).setup_handlers().is_ok());
    }
}
