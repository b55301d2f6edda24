//! Shared fixtures for the navigator integration tests.
//!
//! Every page view-model is a `Page<M>` where the marker `M` names it. Pages
//! write what happens to them into a shared [`Script`], which also tells
//! them how to answer their lifecycle callbacks.

#![allow(dead_code)]

use futures::channel::oneshot;
use futures::executor::LocalSpawner;
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::marker::PhantomData;
use std::rc::Rc;
use view_navigator::*;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Script
// ============================================================================

/// Event log plus scripted callback answers.
#[derive(Default)]
pub struct Script {
    events: RefCell<Vec<String>>,
    to_actions: RefCell<HashMap<&'static str, NavigationAction>>,
    away_actions: RefCell<HashMap<&'static str, NavigationAction>>,
    once: RefCell<HashMap<String, NavigationAction>>,
    gates: RefCell<HashMap<String, oneshot::Receiver<()>>>,
    uncacheable: RefCell<HashSet<&'static str>>,
    created: Cell<usize>,
}

impl Script {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn log(&self, event: impl Into<String>) {
        self.events.borrow_mut().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    /// Events starting with `prefix`.
    pub fn events_with(&self, prefix: &str) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn clear_events(&self) {
        self.events.borrow_mut().clear();
    }

    /// Answer every `on_navigated_to` of `page` with `action`.
    pub fn on_to(&self, page: &'static str, action: NavigationAction) {
        self.to_actions.borrow_mut().insert(page, action);
    }

    /// Answer every `on_navigating_away` of `page` with `action`.
    pub fn on_away(&self, page: &'static str, action: NavigationAction) {
        self.away_actions.borrow_mut().insert(page, action);
    }

    /// Answer only the next callback named `key` (`"to:Home"`,
    /// `"away:Home"`) with `action`.
    pub fn once(&self, key: &str, action: NavigationAction) {
        self.once.borrow_mut().insert(key.to_string(), action);
    }

    pub fn reset_actions(&self) {
        self.to_actions.borrow_mut().clear();
        self.away_actions.borrow_mut().clear();
        self.once.borrow_mut().clear();
    }

    /// Make the next callback named `key` (`"to:Home"`, `"away:Home"`) wait
    /// until the returned sender fires or is dropped.
    pub fn gate(&self, key: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.borrow_mut().insert(key.to_string(), rx);
        tx
    }

    pub fn set_uncacheable(&self, page: &'static str) {
        self.uncacheable.borrow_mut().insert(page);
    }

    pub fn created(&self) -> usize {
        self.created.get()
    }

    async fn pass_gate(&self, key: String) {
        let gate = self.gates.borrow_mut().remove(&key);
        if let Some(rx) = gate {
            let _ = rx.await;
        }
    }

    fn to_action(&self, page: &'static str) -> NavigationAction {
        if let Some(action) = self.once.borrow_mut().remove(&format!("to:{page}")) {
            return action;
        }
        self.to_actions
            .borrow()
            .get(page)
            .cloned()
            .unwrap_or(NavigationAction::Continue)
    }

    fn away_action(&self, page: &'static str) -> NavigationAction {
        if let Some(action) = self.once.borrow_mut().remove(&format!("away:{page}")) {
            return action;
        }
        self.away_actions
            .borrow()
            .get(page)
            .cloned()
            .unwrap_or(NavigationAction::Continue)
    }
}

// ============================================================================
// Pages
// ============================================================================

pub trait Marker: 'static {
    const NAME: &'static str;
}

macro_rules! markers {
    ($($name:ident),* $(,)?) => {
        $(
            pub struct $name;
            impl Marker for $name {
                const NAME: &'static str = stringify!($name);
            }
        )*
    };
}

markers!(Shell, Home, Settings, General, Privacy, Login, Detail, A, B, C, D);

/// Routed view-model named by `M`.
pub struct Page<M: Marker> {
    pub script: Rc<Script>,
    pub params: RouteParams,
    pub instance: usize,
    pub last_args: RefCell<Option<NavigatedToArgs>>,
    marker: PhantomData<M>,
}

impl<M: Marker> Page<M> {
    pub fn new(script: Rc<Script>, params: RouteParams) -> Self {
        let instance = script.created.get() + 1;
        script.created.set(instance);
        script.log(format!("create:{}", M::NAME));
        Self {
            script,
            params,
            instance,
            last_args: RefCell::new(None),
            marker: PhantomData,
        }
    }
}

impl<M: Marker> ViewModel for Page<M> {
    fn on_navigating_away<'a>(
        &'a self,
        _args: &'a NavigatingAwayArgs,
    ) -> LocalBoxFuture<'a, Result<NavigationAction>> {
        Box::pin(async move {
            self.script.log(format!("away?:{}", M::NAME));
            self.script.pass_gate(format!("away:{}", M::NAME)).await;
            Ok(self.script.away_action(M::NAME))
        })
    }

    fn on_navigated_away(&self) {
        self.script.log(format!("left:{}", M::NAME));
    }

    fn on_navigated_to<'a>(
        &'a self,
        args: &'a NavigatedToArgs,
    ) -> LocalBoxFuture<'a, Result<NavigationAction>> {
        Box::pin(async move {
            self.script.log(format!(
                "to:{} first={} active={} child={}",
                M::NAME,
                args.is_first_navigation,
                args.already_active,
                args.has_child
            ));
            *self.last_args.borrow_mut() = Some(args.clone());
            self.script.pass_gate(format!("to:{}", M::NAME)).await;
            Ok(self.script.to_action(M::NAME))
        })
    }

    fn can_be_cached(&self) -> bool {
        !self.script.uncacheable.borrow().contains(M::NAME)
    }

    fn dispose(&self) {
        self.script.log(format!("dispose:{}", M::NAME));
    }

    fn debug_name(&self) -> &'static str {
        M::NAME
    }
}

// ============================================================================
// Views and hosts
// ============================================================================

/// Nested host that records what it is asked to show.
pub struct RecordingHost {
    script: Rc<Script>,
    slot: ContentSlot,
}

impl RecordingHost {
    pub fn new(script: Rc<Script>) -> Rc<Self> {
        Rc::new(Self {
            script,
            slot: ContentSlot::new(),
        })
    }

    pub fn content(&self) -> Option<Rc<dyn View>> {
        self.slot.content()
    }

    /// Name of the view-model shown, if any.
    pub fn shown(&self) -> Option<&'static str> {
        self.slot.content().map(|view| view.view_model().debug_name())
    }
}

impl NestedHost for RecordingHost {
    fn set_content(&self, content: Option<Rc<dyn View>>) {
        match &content {
            Some(view) => self
                .script
                .log(format!("attach:{}", view.view_model().debug_name())),
            None => self.script.log("clear"),
        }
        self.slot.set_content(content);
    }
}

pub struct TestView<M: Marker> {
    view_model: Rc<Page<M>>,
    host: Option<Rc<RecordingHost>>,
}

impl<M: Marker> TestView<M> {
    pub fn leaf(view_model: Rc<Page<M>>) -> Self {
        Self {
            view_model,
            host: None,
        }
    }

    pub fn hosting(view_model: Rc<Page<M>>) -> Self {
        let host = RecordingHost::new(Rc::clone(&view_model.script));
        Self {
            view_model,
            host: Some(host),
        }
    }
}

impl<M: Marker> View for TestView<M> {
    fn view_model(&self) -> Rc<dyn ViewModel> {
        self.view_model.clone()
    }

    fn nested_host(&self) -> Option<Rc<dyn NestedHost>> {
        self.host.clone().map(|host| host as Rc<dyn NestedHost>)
    }
}

fn create<M: Marker>(ctx: &ResolveContext<'_>) -> Result<Page<M>> {
    Ok(Page::new(ctx.resolve::<Script>()?, ctx.params().clone()))
}

pub fn page<M: Marker>() -> ViewRegistration {
    ViewRegistration::new(create::<M>, TestView::<M>::leaf)
}

pub fn hosting_page<M: Marker>() -> ViewRegistration {
    ViewRegistration::new(create::<M>, TestView::<M>::hosting).hosting_children()
}

// ============================================================================
// Application
// ============================================================================

/// Test application and its collaborators.
pub struct App {
    pub navigator: Navigator,
    pub script: Rc<Script>,
    pub root: Rc<RecordingHost>,
}

/// Builder for the standard route tree:
///
/// ```text
/// ""  Shell
/// ├── home                Home
/// ├── settings            Settings
/// │   ├── general         General
/// │   └── privacy         Privacy
/// ├── login               Login
/// ├── items/{id}          Detail (id: uint)
/// └── a, b, c, d          A, B, C, D
/// ```
pub fn builder(script: &Rc<Script>, root: &Rc<RecordingHost>) -> NavigatorBuilder {
    init_logging();
    Navigator::builder()
        .services(ServiceCollection::new().with(Rc::clone(script)))
        .root_host(Rc::clone(root) as Rc<dyn NestedHost>)
        .view(hosting_page::<Shell>())
        .view(page::<Home>())
        .view(hosting_page::<Settings>())
        .view(page::<General>())
        .view(page::<Privacy>())
        .view(page::<Login>())
        .view(page::<Detail>())
        .view(page::<A>())
        .view(page::<B>())
        .view(page::<C>())
        .view(page::<D>())
        .route(RouteDefinition::new::<Page<Shell>>(""))
        .route(RouteDefinition::new::<Page<Home>>("home").child_of::<Page<Shell>>())
        .route(RouteDefinition::new::<Page<Settings>>("settings").child_of::<Page<Shell>>())
        .route(RouteDefinition::new::<Page<General>>("general").child_of::<Page<Settings>>())
        .route(RouteDefinition::new::<Page<Privacy>>("privacy").child_of::<Page<Settings>>())
        .route(RouteDefinition::new::<Page<Login>>("login").child_of::<Page<Shell>>())
        .route(
            RouteDefinition::new::<Page<Detail>>("items/{id}")
                .param("id", ParamKind::UInt)
                .child_of::<Page<Shell>>(),
        )
        .route(RouteDefinition::new::<Page<A>>("a").child_of::<Page<Shell>>())
        .route(RouteDefinition::new::<Page<B>>("b").child_of::<Page<Shell>>())
        .route(RouteDefinition::new::<Page<C>>("c").child_of::<Page<Shell>>())
        .route(RouteDefinition::new::<Page<D>>("d").child_of::<Page<Shell>>())
}

pub fn app_with(config: NavigatorConfig) -> App {
    let script = Script::new();
    let root = RecordingHost::new(Rc::clone(&script));
    let navigator = builder(&script, &root)
        .config(config)
        .build()
        .expect("test routes are valid");
    App {
        navigator,
        script,
        root,
    }
}

pub fn app() -> App {
    app_with(NavigatorConfig::default())
}

/// Navigate and insist on success.
pub fn go(navigator: &Navigator, path: &str) {
    let result = pollster::block_on(navigator.navigate(path)).expect("navigation succeeds");
    assert!(result.is_success(), "navigation to {path} gave {result:?}");
}

/// Name of the view-model at `depth` of the current route.
pub fn page_at(navigator: &Navigator, depth: usize) -> Option<&'static str> {
    let entry = navigator.current_entry()?;
    entry.items().get(depth)?.view_model().map(|vm| vm.debug_name())
}

/// Outcome slot filled by a spawned navigation.
pub type Outcome = Rc<RefCell<Option<Result<NavigationResult>>>>;

/// Spawn `navigator.navigate(path)` on `spawner`.
pub fn spawn_navigation(spawner: &LocalSpawner, navigator: &Navigator, path: &str) -> Outcome {
    let navigator = navigator.clone();
    let path = path.to_string();
    spawn_outcome(spawner, async move { navigator.navigate(&path).await })
}

/// Spawn `navigator.back()` on `spawner`.
pub fn spawn_back(spawner: &LocalSpawner, navigator: &Navigator) -> Outcome {
    let navigator = navigator.clone();
    spawn_outcome(spawner, async move { navigator.back().await })
}

fn spawn_outcome(
    spawner: &LocalSpawner,
    run: impl Future<Output = Result<NavigationResult>> + 'static,
) -> Outcome {
    let outcome: Outcome = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&outcome);
    spawner
        .spawn_local(async move {
            let result = run.await;
            *slot.borrow_mut() = Some(result);
        })
        .expect("spawner accepts tasks");
    outcome
}

/// Paths of the history entries, oldest first.
pub fn history_paths(navigator: &Navigator) -> Vec<String> {
    navigator
        .history()
        .iter()
        .map(|entry| entry.path().to_string())
        .collect()
}

/// Take the finished outcome out of `outcome`.
pub fn finished(outcome: &Outcome) -> NavigationResult {
    outcome
        .borrow_mut()
        .take()
        .expect("navigation finished")
        .expect("navigation succeeded")
}
