use crate::data::record::Record;
use crate::ui::traits::PopupController;
use std::cell::Cell;
use std::rc::Rc;

/// Wraps the host popup so dismissal can be switched off for a scope.
///
/// While a [`DismissGuard`] is alive, `dismiss` is a no-op. Dropping the guard puts
/// back whatever state was in effect when it was taken, so guards nest and the popup
/// is restored on every exit path, early returns and unwinding included.
pub struct SuppressiblePopup {
    inner: Box<dyn PopupController>,
    suppressed: Rc<Cell<bool>>,
}

impl SuppressiblePopup {
    pub fn new(inner: Box<dyn PopupController>) -> Self {
        Self {
            inner,
            suppressed: Rc::new(Cell::new(false)),
        }
    }

    pub fn suppress_dismiss(&self) -> DismissGuard {
        let previous = self.suppressed.replace(true);
        DismissGuard {
            flag: Rc::clone(&self.suppressed),
            previous,
        }
    }

    pub fn is_dismiss_suppressed(&self) -> bool {
        self.suppressed.get()
    }
}

impl PopupController for SuppressiblePopup {
    fn dismiss(&mut self) {
        if self.suppressed.get() {
            log::debug!("popup dismiss suppressed");
            return;
        }
        self.inner.dismiss();
    }

    fn show_record(&mut self, record: &Record, pan_into_view: bool) {
        self.inner.show_record(record, pan_into_view);
    }
}

#[must_use = "dismissal is only suppressed while the guard is alive"]
pub struct DismissGuard {
    flag: Rc<Cell<bool>>,
    previous: bool,
}

impl Drop for DismissGuard {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct CountingPopup {
        dismissed: Rc<RefCell<usize>>,
    }

    impl PopupController for CountingPopup {
        fn dismiss(&mut self) {
            *self.dismissed.borrow_mut() += 1;
        }

        fn show_record(&mut self, _record: &Record, _pan_into_view: bool) {}
    }

    fn popup() -> (SuppressiblePopup, Rc<RefCell<usize>>) {
        let counting = CountingPopup::default();
        let dismissed = Rc::clone(&counting.dismissed);
        (SuppressiblePopup::new(Box::new(counting)), dismissed)
    }

    #[test]
    fn test_dismiss_passes_through() {
        let (mut popup, dismissed) = popup();
        popup.dismiss();
        assert_eq!(*dismissed.borrow(), 1);
    }

    #[test]
    fn test_guard_suppresses_and_restores() {
        let (mut popup, dismissed) = popup();
        {
            let _guard = popup.suppress_dismiss();
            popup.dismiss();
            assert!(popup.is_dismiss_suppressed());
        }
        assert_eq!(*dismissed.borrow(), 0);
        assert!(!popup.is_dismiss_suppressed());

        popup.dismiss();
        assert_eq!(*dismissed.borrow(), 1);
    }

    #[test]
    fn test_nested_guards_restore_outer_state() {
        let (popup, _) = popup();
        let outer = popup.suppress_dismiss();
        {
            let _inner = popup.suppress_dismiss();
        }
        assert!(popup.is_dismiss_suppressed());
        drop(outer);
        assert!(!popup.is_dismiss_suppressed());
    }

    #[test]
    fn test_guard_restores_on_error_path() {
        fn failing_reset(popup: &mut SuppressiblePopup) -> Result<(), String> {
            let _guard = popup.suppress_dismiss();
            popup.dismiss();
            Err::<(), String>("list widget failed".to_string())?;
            Ok(())
        }

        let (mut popup, dismissed) = popup();
        assert!(failing_reset(&mut popup).is_err());
        assert!(!popup.is_dismiss_suppressed());
        assert_eq!(*dismissed.borrow(), 0);
    }

    #[test]
    fn test_guard_restores_on_panic() {
        let (popup, _) = popup();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = popup.suppress_dismiss();
            panic!("reset blew up");
        }));
        assert!(result.is_err());
        assert!(!popup.is_dismiss_suppressed());
    }
}
