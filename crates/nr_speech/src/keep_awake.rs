use nr_core::KeepAwake;
use std::process::{Child, Command, Stdio};
use tracing::{debug, warn};

/// Holds a long-running inhibitor process (e.g. `systemd-inhibit sleep infinity`)
/// for as long as the resource is acquired.
pub struct CommandKeepAwake {
    program: String,
    args: Vec<String>,
    child: Option<Child>,
}

impl CommandKeepAwake {
    /// `command` is the program followed by its arguments; `None` when empty
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            child: None,
        })
    }

    pub fn is_held(&self) -> bool {
        self.child.is_some()
    }
}

impl KeepAwake for CommandKeepAwake {
    fn acquire(&mut self) -> bool {
        if self.child.is_some() {
            return true;
        }
        match Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => {
                debug!("Keep-awake held by {} (pid {})", self.program, child.id());
                self.child = Some(child);
                true
            }
            Err(e) => {
                warn!("⚠️ Could not start keep-awake command {}: {}", self.program, e);
                false
            }
        }
    }

    fn release(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
            debug!("Keep-awake released");
        }
    }
}

impl Drop for CommandKeepAwake {
    fn drop(&mut self) {
        self.release();
    }
}

/// Used when no keep-awake command is configured; never acquires anything
#[derive(Debug, Default)]
pub struct NoKeepAwake;

impl KeepAwake for NoKeepAwake {
    fn acquire(&mut self) -> bool {
        false
    }

    fn release(&mut self) {}
}
