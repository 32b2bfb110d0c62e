use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use upkeep::errors::Result;
use upkeep::process::{ExitNotice, KillSignal, LaunchPlan, LauncherBackend, SpawnHandle};

/// A fake launcher that:
/// - records every [`LaunchPlan`] it is asked to spawn
/// - hands out a [`FakeProcessHandle`] per launch, so tests can fabricate
///   exits and observe kill signals.
pub struct FakeLauncher {
    launched: Mutex<Vec<LaunchPlan>>,
    handles: Mutex<Vec<Arc<FakeProcessHandle>>>,
    fail_next: AtomicBool,
    next_pid: AtomicU32,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            launched: Mutex::new(Vec::new()),
            handles: Mutex::new(Vec::new()),
            fail_next: AtomicBool::new(false),
            next_pid: AtomicU32::new(4000),
        }
    }

    /// Make the next `launch` call fail instead of producing a handle.
    pub fn fail_next_launch(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Plans received so far, in launch order.
    pub fn launched(&self) -> Vec<LaunchPlan> {
        self.launched.lock().unwrap().clone()
    }

    pub fn launch_count(&self) -> usize {
        self.launched.lock().unwrap().len()
    }

    /// Handle for the `idx`-th launch (0-based).
    pub fn handle(&self, idx: usize) -> Arc<FakeProcessHandle> {
        Arc::clone(&self.handles.lock().unwrap()[idx])
    }

    pub fn last_handle(&self) -> Option<Arc<FakeProcessHandle>> {
        self.handles.lock().unwrap().last().map(Arc::clone)
    }
}

impl Default for FakeLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl LauncherBackend for FakeLauncher {
    fn launch(
        &self,
        plan: LaunchPlan,
    ) -> Pin<Box<dyn Future<Output = Result<SpawnHandle>> + Send + '_>> {
        Box::pin(async move {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(anyhow::anyhow!("injected launch failure").into());
            }

            let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
            let (kill_tx, kill_rx) = mpsc::channel(4);
            let (exit_tx, exit_rx) = watch::channel(None);

            let handle = Arc::new(FakeProcessHandle {
                pid,
                exit_tx,
                kill_rx: AsyncMutex::new(kill_rx),
            });

            self.launched.lock().unwrap().push(plan);
            self.handles.lock().unwrap().push(Arc::clone(&handle));

            Ok(SpawnHandle {
                pid,
                kill_tx,
                exit_rx,
            })
        })
    }
}

/// Test-side view of one fake launch.
///
/// Holding the handle keeps the exit channel open; the "process" runs until
/// [`exit`](FakeProcessHandle::exit) is called or the handle is dropped.
pub struct FakeProcessHandle {
    pid: u32,
    exit_tx: watch::Sender<Option<ExitNotice>>,
    kill_rx: AsyncMutex<mpsc::Receiver<KillSignal>>,
}

impl FakeProcessHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Fabricate the process exiting with `code`.
    pub fn exit(&self, code: i32) {
        let _ = self.exit_tx.send(Some(ExitNotice { code: Some(code) }));
    }

    /// Fabricate an exit without a code (killed by signal on Unix).
    pub fn exit_signalled(&self) {
        let _ = self.exit_tx.send(Some(ExitNotice { code: None }));
    }

    /// Wait for the next kill signal sent to this process.
    pub async fn recv_kill(&self) -> Option<KillSignal> {
        self.kill_rx.lock().await.recv().await
    }

    /// Kill signal already sent, if any; does not wait.
    pub async fn try_recv_kill(&self) -> Option<KillSignal> {
        self.kill_rx.lock().await.try_recv().ok()
    }
}
