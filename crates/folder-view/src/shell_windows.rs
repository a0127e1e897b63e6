//! Process-wide registration of folder views with the shell's window list.
//!
//! One `ShellWindowRegistry` is shared by every view in the process. It connects to its
//! backend when the first view acquires a handle and disconnects when the last handle is
//! dropped. Each view registers its window lazily, on its first successful navigation.

use crate::ignore_poison::IgnorePoison;
use crate::shell::{ItemIdList, ShellError};
use std::sync::{Arc, Mutex};

/// Token the backend hands out for a registered window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowCookie(pub u64);

/// The shell's list of open folder windows.
pub trait ShellWindowsBackend: Send + Sync {
    fn connect(&self) -> Result<(), ShellError>;
    fn disconnect(&self);
    fn register_window(&self, folder: &ItemIdList) -> Result<WindowCookie, ShellError>;
    fn on_navigate(&self, cookie: WindowCookie, folder: &ItemIdList);
    fn revoke(&self, cookie: WindowCookie);
}

/// Backend for hosts without a shell window list.
#[derive(Debug, Default)]
pub struct NoopShellWindows;

impl ShellWindowsBackend for NoopShellWindows {
    fn connect(&self) -> Result<(), ShellError> {
        Ok(())
    }

    fn disconnect(&self) {}

    fn register_window(&self, _folder: &ItemIdList) -> Result<WindowCookie, ShellError> {
        Ok(WindowCookie(0))
    }

    fn on_navigate(&self, _cookie: WindowCookie, _folder: &ItemIdList) {}

    fn revoke(&self, _cookie: WindowCookie) {}
}

#[derive(Debug, Default)]
struct RegistryState {
    handles: usize,
    connected: bool,
}

pub struct ShellWindowRegistry {
    backend: Arc<dyn ShellWindowsBackend>,
    state: Mutex<RegistryState>,
}

impl ShellWindowRegistry {
    pub fn new(backend: Arc<dyn ShellWindowsBackend>) -> Arc<Self> {
        Arc::new(Self {
            backend,
            state: Mutex::new(RegistryState::default()),
        })
    }

    /// A registry that registers nothing.
    pub fn noop() -> Arc<Self> {
        Self::new(Arc::new(NoopShellWindows))
    }

    /// Takes a handle for one view. The first handle connects the backend.
    pub fn acquire(self: &Arc<Self>) -> ShellWindowsHandle {
        let mut state = self.state.lock_ignore_poison();
        state.handles += 1;
        if state.handles == 1 {
            match self.backend.connect() {
                Ok(()) => state.connected = true,
                Err(e) => log::warn!("ShellWindows: couldn't connect: {}", e),
            }
        }
        ShellWindowsHandle {
            registry: Arc::clone(self),
            cookie: None,
        }
    }

    pub fn active_handles(&self) -> usize {
        self.state.lock_ignore_poison().handles
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock_ignore_poison().connected
    }

    fn release(&self) {
        let mut state = self.state.lock_ignore_poison();
        state.handles = state.handles.saturating_sub(1);
        if state.handles == 0 && state.connected {
            self.backend.disconnect();
            state.connected = false;
        }
    }
}

/// One view's registration. Revokes the window and releases the registry on drop.
pub struct ShellWindowsHandle {
    registry: Arc<ShellWindowRegistry>,
    cookie: Option<WindowCookie>,
}

impl ShellWindowsHandle {
    /// Reports that the view now shows `folder`, registering the window on first use.
    pub fn notify_navigation(&mut self, folder: &ItemIdList) {
        if !self.registry.is_connected() {
            return;
        }
        match self.cookie {
            Some(cookie) => self.registry.backend.on_navigate(cookie, folder),
            None => match self.registry.backend.register_window(folder) {
                Ok(cookie) => self.cookie = Some(cookie),
                Err(e) => log::warn!("ShellWindows: couldn't register window for {}: {}", folder, e),
            },
        }
    }

    pub fn cookie(&self) -> Option<WindowCookie> {
        self.cookie
    }
}

impl Drop for ShellWindowsHandle {
    fn drop(&mut self) {
        if let Some(cookie) = self.cookie.take() {
            self.registry.backend.revoke(cookie);
        }
        self.registry.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    enum Call {
        Connect,
        Disconnect,
        Register(String),
        Navigate(u64, String),
        Revoke(u64),
    }

    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<Call>>,
        next_cookie: Mutex<u64>,
    }

    impl ShellWindowsBackend for RecordingBackend {
        fn connect(&self) -> Result<(), ShellError> {
            self.calls.lock().unwrap().push(Call::Connect);
            Ok(())
        }

        fn disconnect(&self) {
            self.calls.lock().unwrap().push(Call::Disconnect);
        }

        fn register_window(&self, folder: &ItemIdList) -> Result<WindowCookie, ShellError> {
            self.calls.lock().unwrap().push(Call::Register(folder.to_string()));
            let mut next = self.next_cookie.lock().unwrap();
            *next += 1;
            Ok(WindowCookie(*next))
        }

        fn on_navigate(&self, cookie: WindowCookie, folder: &ItemIdList) {
            self.calls.lock().unwrap().push(Call::Navigate(cookie.0, folder.to_string()));
        }

        fn revoke(&self, cookie: WindowCookie) {
            self.calls.lock().unwrap().push(Call::Revoke(cookie.0));
        }
    }

    #[test]
    fn connects_on_first_acquire_and_disconnects_on_last_release() {
        let backend = Arc::new(RecordingBackend::default());
        let registry = ShellWindowRegistry::new(backend.clone());

        let first = registry.acquire();
        let second = registry.acquire();
        assert_eq!(registry.active_handles(), 2);
        drop(first);
        assert!(registry.is_connected());
        drop(second);
        assert!(!registry.is_connected());

        assert_eq!(*backend.calls.lock().unwrap(), vec![Call::Connect, Call::Disconnect]);
    }

    #[test]
    fn window_registers_lazily_and_revokes_on_drop() {
        let backend = Arc::new(RecordingBackend::default());
        let registry = ShellWindowRegistry::new(backend.clone());

        let mut handle = registry.acquire();
        assert_eq!(handle.cookie(), None);
        handle.notify_navigation(&ItemIdList::parse("/a"));
        handle.notify_navigation(&ItemIdList::parse("/b"));
        assert_eq!(handle.cookie(), Some(WindowCookie(1)));
        drop(handle);

        assert_eq!(
            *backend.calls.lock().unwrap(),
            vec![
                Call::Connect,
                Call::Register("/a".to_string()),
                Call::Navigate(1, "/b".to_string()),
                Call::Revoke(1),
                Call::Disconnect,
            ]
        );
    }
}
