//! Modal dialog stack.
//!
//! Dialogs are shown through a [`DialogPresenter`]. The navigator's root
//! presenter ([`Navigator::dialogs`](crate::Navigator::dialogs)) may only
//! open a dialog while the stack is empty; a dialog that wants to open a
//! nested one must go through the presenter of its own [`DialogHandle`].
//! Only the top frame is interactive:
//!
//! ```text
//! root presenter ──show──▶ [Confirm]            Confirm presented
//! Confirm's presenter ──show──▶ [Confirm, Pick]  Confirm hidden, Pick presented
//! root presenter ──show──▶ ✗ InvalidOperation   Pick is on top
//! Pick.close(result)     ──▶ [Confirm]           Pick removed, Confirm presented
//! ```
//!
//! Dialogs and navigations are mutually exclusive: the navigator refuses to
//! start while frames exist, and the stack refuses to open while a
//! navigation is in flight. The one exception is the presenter handed to the
//! lifecycle callbacks of the running navigation (`args.dialogs`), which may
//! open dialogs outside the navigator's synchronous sections, typically to
//! ask for confirmation before leaving. Such dialogs must be closed before
//! the callback returns.
//!
//! The stack does not render anything. Each registered dialog view-model
//! type maps to a content factory; the produced content is handed to a
//! [`DialogSurface`] which presents, hides and removes it.

use crate::blocking::BlockingFlags;
use crate::error::{NavigationError, Result};
use crate::lifecycle::NavigationAction;
use crate::route::TypeKey;
use crate::{debug_log, error_log, info_log, trace_log};
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

// ============================================================================
// Contracts
// ============================================================================

/// View-model of a modal dialog.
pub trait DialogViewModel: Any {
    /// Whether an escape/back gesture may dismiss this dialog.
    fn is_dismissible(&self) -> bool {
        false
    }

    /// Cancellable dismiss notification.
    ///
    /// Returning [`NavigationAction::Deny`] keeps the dialog open; any other
    /// answer closes it without a result.
    fn on_dismiss_requested<'a>(&'a self) -> LocalBoxFuture<'a, Result<NavigationAction>> {
        Box::pin(async { Ok(NavigationAction::Continue) })
    }

    /// Name used in log records.
    fn debug_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Whatever the UI layer renders for a dialog.
pub type DialogContent = Rc<dyn Any>;

/// Value a dialog is closed with.
pub type DialogResult = Option<Box<dyn Any>>;

/// Identity of a dialog frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DialogId(u64);

impl fmt::Display for DialogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dialog#{}", self.0)
    }
}

/// Where dialog content is shown.
pub trait DialogSurface {
    /// Show `content` as the interactive top dialog.
    fn present(&self, id: DialogId, content: &DialogContent);

    /// Hide `content` because a nested dialog is covering it.
    fn hide(&self, id: DialogId, content: &DialogContent);

    /// Remove `content` for good.
    fn remove(&self, id: DialogId, content: &DialogContent);
}

/// Surface that shows nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface;

impl DialogSurface for NullSurface {
    fn present(&self, _id: DialogId, _content: &DialogContent) {}
    fn hide(&self, _id: DialogId, _content: &DialogContent) {}
    fn remove(&self, _id: DialogId, _content: &DialogContent) {}
}

// ============================================================================
// Registry
// ============================================================================

type ContentFn = dyn Fn(&Rc<dyn Any>) -> Option<DialogContent>;

/// Content factory for one dialog view-model type.
pub struct DialogRegistration {
    view_model: TypeKey,
    build: Rc<ContentFn>,
}

impl DialogRegistration {
    pub fn new<VM, C, F>(build: F) -> Self
    where
        VM: DialogViewModel,
        C: 'static,
        F: Fn(Rc<VM>) -> C + 'static,
    {
        let erased = move |any: &Rc<dyn Any>| -> Option<DialogContent> {
            let view_model = Rc::clone(any).downcast::<VM>().ok()?;
            Some(Rc::new(build(view_model)) as DialogContent)
        };
        Self {
            view_model: TypeKey::of::<VM>(),
            build: Rc::new(erased),
        }
    }

    pub fn view_model(&self) -> TypeKey {
        self.view_model
    }
}

impl fmt::Debug for DialogRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogRegistration")
            .field("view_model", &self.view_model.name())
            .finish_non_exhaustive()
    }
}

/// Dialog view-model type → content factory.
#[derive(Debug, Default)]
pub struct DialogRegistry {
    registrations: HashMap<TypeId, DialogRegistration>,
}

impl DialogRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, registration: DialogRegistration) -> Result<()> {
        let key = registration.view_model();
        if self.registrations.contains_key(&key.id()) {
            error_log!("Duplicate dialog registration for {}", key.name());
            return Err(NavigationError::configuration(format!(
                "a dialog is already registered for {}",
                key.name()
            )));
        }
        debug_log!("Registered dialog for {}", key.name());
        self.registrations.insert(key.id(), registration);
        Ok(())
    }

    pub fn contains(&self, view_model: TypeKey) -> bool {
        self.registrations.contains_key(&view_model.id())
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

// ============================================================================
// Frames
// ============================================================================

struct FrameInner {
    id: DialogId,
    view_model: Rc<dyn DialogViewModel>,
    view_model_any: Rc<dyn Any>,
    content: DialogContent,
    result: RefCell<Option<oneshot::Sender<DialogResult>>>,
    stack: Weak<DialogStack>,
}

/// One open modal presentation.
#[derive(Clone)]
pub struct DialogFrame(Rc<FrameInner>);

impl DialogFrame {
    pub fn id(&self) -> DialogId {
        self.0.id
    }

    pub fn view_model(&self) -> Rc<dyn DialogViewModel> {
        Rc::clone(&self.0.view_model)
    }

    /// The view-model as its concrete type.
    pub fn view_model_as<T: 'static>(&self) -> Option<Rc<T>> {
        Rc::clone(&self.0.view_model_any).downcast::<T>().ok()
    }

    pub fn content(&self) -> DialogContent {
        Rc::clone(&self.0.content)
    }

    /// Whether the frame has not been closed yet.
    pub fn is_open(&self) -> bool {
        self.0.result.borrow().is_some()
    }

    /// Close this frame with `result`; it must be the top frame.
    pub fn close(&self, result: DialogResult) -> Result<()> {
        let stack = self.0.stack.upgrade().ok_or_else(|| {
            NavigationError::invalid_operation("the dialog stack no longer exists")
        })?;
        stack.close(self, result)
    }
}

impl PartialEq for DialogFrame {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for DialogFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogFrame")
            .field("id", &self.0.id)
            .field("view_model", &self.0.view_model.debug_name())
            .field("open", &self.is_open())
            .finish()
    }
}

// ============================================================================
// Presenter and handle
// ============================================================================

/// Capability to open dialogs at one position of the stack.
///
/// The root presenter owns the empty stack; each shown dialog hands out a
/// presenter that owns its own frame. A presenter obtained from lifecycle
/// callback arguments, and every presenter derived from it, may open dialogs
/// while that navigation runs.
#[derive(Clone)]
pub struct DialogPresenter {
    stack: Weak<DialogStack>,
    owner: Option<DialogId>,
    in_navigation: bool,
}

impl DialogPresenter {
    /// Open `view_model` on top of the frame this presenter owns.
    pub fn show<VM: DialogViewModel>(&self, view_model: Rc<VM>) -> Result<DialogHandle> {
        let stack = self.stack.upgrade().ok_or_else(|| {
            NavigationError::invalid_operation("the dialog stack no longer exists")
        })?;
        stack.show(self, view_model)
    }

    /// Frame this presenter belongs to; `None` for the root presenter.
    pub fn owner(&self) -> Option<DialogId> {
        self.owner
    }
}

impl fmt::Debug for DialogPresenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogPresenter")
            .field("owner", &self.owner)
            .field("in_navigation", &self.in_navigation)
            .finish_non_exhaustive()
    }
}

/// Returned by [`DialogPresenter::show`].
pub struct DialogHandle {
    frame: DialogFrame,
    receiver: oneshot::Receiver<DialogResult>,
    presenter: DialogPresenter,
}

impl DialogHandle {
    pub fn frame(&self) -> &DialogFrame {
        &self.frame
    }

    /// Presenter for dialogs nested in this one.
    pub fn presenter(&self) -> DialogPresenter {
        self.presenter.clone()
    }

    /// Close the dialog with `result`.
    pub fn close(&self, result: DialogResult) -> Result<()> {
        self.frame.close(result)
    }

    /// Wait until the dialog is closed.
    ///
    /// Resolves to `None` when it was closed without a result, dismissed, or
    /// dropped with the navigator.
    pub async fn result(self) -> DialogResult {
        self.receiver.await.ok().flatten()
    }

    /// Wait for the result and downcast it to `T`.
    pub async fn result_as<T: 'static>(self) -> Option<T> {
        let result = self.result().await?;
        result.downcast::<T>().ok().map(|boxed| *boxed)
    }
}

impl fmt::Debug for DialogHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogHandle")
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// DialogStack
// ============================================================================

/// Stack of open dialog frames.
pub(crate) struct DialogStack {
    frames: RefCell<Vec<DialogFrame>>,
    flags: Rc<BlockingFlags>,
    surface: Rc<dyn DialogSurface>,
    registry: DialogRegistry,
    next_id: Cell<u64>,
    this: Weak<DialogStack>,
}

impl DialogStack {
    pub(crate) fn new(
        flags: Rc<BlockingFlags>,
        surface: Rc<dyn DialogSurface>,
        registry: DialogRegistry,
    ) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            frames: RefCell::new(Vec::new()),
            flags,
            surface,
            registry,
            next_id: Cell::new(1),
            this: this.clone(),
        })
    }

    pub(crate) fn root_presenter(&self) -> DialogPresenter {
        DialogPresenter {
            stack: self.this.clone(),
            owner: None,
            in_navigation: false,
        }
    }

    /// Root presenter for the lifecycle callbacks of a running navigation.
    pub(crate) fn navigation_presenter(&self) -> DialogPresenter {
        DialogPresenter {
            in_navigation: true,
            ..self.root_presenter()
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.frames.borrow().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.frames.borrow().is_empty()
    }

    pub(crate) fn top(&self) -> Option<DialogFrame> {
        self.frames.borrow().last().cloned()
    }

    fn show<VM: DialogViewModel>(
        &self,
        presenter: &DialogPresenter,
        view_model: Rc<VM>,
    ) -> Result<DialogHandle> {
        let name = view_model.debug_name();
        if self.flags.dialogs_blocked() {
            return Err(NavigationError::invalid_operation(format!(
                "cannot show {} while a navigation is committing",
                name
            )));
        }
        if self.flags.navigation_in_flight() && !presenter.in_navigation {
            return Err(NavigationError::invalid_operation(format!(
                "cannot show {} while a navigation is in flight",
                name
            )));
        }
        let top = self.top().map(|frame| frame.id());
        if top != presenter.owner {
            return Err(NavigationError::invalid_operation(format!(
                "cannot show {}: only the presenter of the top dialog may open a dialog",
                name
            )));
        }
        let registration = self
            .registry
            .registrations
            .get(&TypeId::of::<VM>())
            .ok_or_else(|| {
                NavigationError::configuration(format!("no dialog registered for {}", name))
            })?;

        let view_model_any: Rc<dyn Any> = Rc::clone(&view_model) as Rc<dyn Any>;
        let content = (registration.build)(&view_model_any).ok_or_else(|| {
            NavigationError::consistency(format!("dialog factory rejected {}", name))
        })?;

        let id = DialogId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        let (sender, receiver) = oneshot::channel();
        let frame = DialogFrame(Rc::new(FrameInner {
            id,
            view_model: view_model as Rc<dyn DialogViewModel>,
            view_model_any,
            content,
            result: RefCell::new(Some(sender)),
            stack: self.this.clone(),
        }));

        let previous = {
            let mut frames = self.frames.borrow_mut();
            let previous = frames.last().cloned();
            frames.push(frame.clone());
            previous
        };
        if let Some(previous) = previous {
            trace_log!("Hiding {} under {}", previous.id(), id);
            self.surface.hide(previous.id(), &previous.0.content);
        }
        self.surface.present(id, &frame.0.content);
        info_log!("Showing {} ({}), stack depth {}", id, name, self.len());

        Ok(DialogHandle {
            frame,
            receiver,
            presenter: DialogPresenter {
                stack: self.this.clone(),
                owner: Some(id),
                in_navigation: presenter.in_navigation,
            },
        })
    }

    pub(crate) fn close(&self, frame: &DialogFrame, result: DialogResult) -> Result<()> {
        let new_top = {
            let mut frames = self.frames.borrow_mut();
            if frames.last() != Some(frame) {
                return Err(NavigationError::invalid_operation(format!(
                    "cannot close {}: it is not the top dialog",
                    frame.id()
                )));
            }
            frames.pop();
            frames.last().cloned()
        };

        self.surface.remove(frame.id(), &frame.0.content);
        let sender = frame.0.result.borrow_mut().take();
        if let Some(sender) = sender {
            // The receiver may already be gone; the close still stands.
            let _ = sender.send(result);
        }
        info_log!(
            "Closed {} ({}), stack depth {}",
            frame.id(),
            frame.0.view_model.debug_name(),
            self.len()
        );
        if let Some(top) = new_top {
            self.surface.present(top.id(), &top.0.content);
        }
        Ok(())
    }

    /// Run the dismiss protocol on the top frame.
    ///
    /// Returns `true` when a frame was closed.
    pub(crate) async fn request_dismiss(&self) -> Result<bool> {
        let Some(top) = self.top() else {
            return Ok(false);
        };
        let view_model = top.view_model();
        if !view_model.is_dismissible() {
            trace_log!("{} is not dismissible", top.id());
            return Ok(false);
        }
        let action = view_model.on_dismiss_requested().await?;
        if let NavigationAction::Deny { reason } = action {
            debug_log!("Dismiss of {} refused: {}", top.id(), reason);
            return Ok(false);
        }
        if self.top().as_ref() != Some(&top) {
            debug_log!("{} is no longer on top; dismiss dropped", top.id());
            return Ok(false);
        }
        self.close(&top, None)?;
        Ok(true)
    }
}

impl fmt::Debug for DialogStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogStack")
            .field("frames", &self.frames.borrow())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
