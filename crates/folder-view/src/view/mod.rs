//! The folder view: owns the item store, the list display and everything feeding them.
//!
//! A view lives on one synchronizing thread. Enumeration jobs, the watcher and the
//! enrichment pools only ever reach it through its message queue, which the host pumps with
//! `process_pending_messages` or `wait_for_message`.
//!
//! Navigation flow:
//! 1. `navigate` applies what's left for the folder being left, starts buffering changes,
//!    starts watching the target and spawns the enumeration.
//! 2. When the matching `EnumerationCompleted` arrives, the old epoch is dropped wholesale,
//!    the snapshot is inserted, and deferred changes the snapshot doesn't cover are replayed.
//! 3. A failed enumeration leaves the displayed folder untouched.

mod arrange;
mod changes;
mod enrichment;

pub use changes::DeviceEvent;

use crate::config::{FolderSettings, GlobalFolderSettings, ViewMode};
use crate::display::ListDisplay;
use crate::enumerator::{EnumerationError, EnumerationJob};
use crate::events::{EventBus, NavigateParams, NavigationSnapshot, ViewEvent};
use crate::filter::ItemFilter;
use crate::grouping::GroupSet;
use crate::messages::ViewMessage;
use crate::model::{ItemInfo, ItemStore, ShellItem};
use crate::providers::columns::{Column, ColumnResult, FolderColumns};
use crate::providers::icons::{IconCache, IconExtractor, IconRef, PlaceholderIconExtractor};
use crate::providers::thumbnails::ImageThumbnailExtractor;
use crate::reconciler::{ChangeReconciler, ChangeSink};
use crate::shell::{ItemIdList, ShellNamespace};
use crate::shell_windows::{ShellWindowRegistry, ShellWindowsHandle};
use crate::sorting::{SortDirection, SortMode};
use crate::tasks::{TaskDispatcher, TaskKind};
use crate::watcher::FolderWatcher;
use std::collections::HashSet;
use std::ops::Range;
use std::sync::{Arc, mpsc};
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("Failed to build the {kind:?} worker pool: {source}")]
    ThreadPool {
        kind: TaskKind,
        #[source]
        source: rayon::ThreadPoolBuildError,
    },
    #[error("Failed to start enumeration: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Everything a view is built from besides its namespace and display.
pub struct ViewOptions {
    pub settings: FolderSettings,
    pub global: GlobalFolderSettings,
    pub shell_windows: Arc<ShellWindowRegistry>,
    /// Defaults to flat placeholder icons.
    pub icon_extractor: Option<Arc<dyn IconExtractor>>,
    /// Defaults to decoding image files.
    pub thumbnail_extractor: Option<Arc<dyn IconExtractor>>,
    /// Watch file system folders for changes.
    pub watch_changes: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            settings: FolderSettings::default(),
            global: GlobalFolderSettings::default(),
            shell_windows: ShellWindowRegistry::noop(),
            icon_extractor: None,
            thumbnail_extractor: None,
            watch_changes: true,
        }
    }
}

pub struct FolderView<D: ListDisplay> {
    namespace: Arc<dyn ShellNamespace>,
    display: D,
    store: ItemStore,
    groups: GroupSet,
    settings: FolderSettings,
    global: GlobalFolderSettings,
    columns: FolderColumns,
    events: EventBus,
    sender: mpsc::Sender<ViewMessage>,
    receiver: mpsc::Receiver<ViewMessage>,
    reconciler: ChangeReconciler,
    watch_changes: bool,
    watcher: Option<FolderWatcher>,
    /// Watcher on the folder being navigated to, swapped in on commit.
    pending_watcher: Option<FolderWatcher>,
    pending_navigation: Option<NavigateParams>,
    /// Whether any navigation has committed yet.
    committed: bool,
    column_tasks: TaskDispatcher<ColumnResult>,
    icon_tasks: TaskDispatcher<(String, IconRef)>,
    thumbnail_tasks: TaskDispatcher<IconRef>,
    info_tip_tasks: TaskDispatcher<String>,
    icon_extractor: Arc<dyn IconExtractor>,
    thumbnail_extractor: Arc<dyn IconExtractor>,
    icon_cache: IconCache,
    shell_windows: ShellWindowsHandle,
    /// Display positions on screen. `None` means all of them.
    visible_range: Option<Range<usize>>,
    /// Item to start renaming as soon as it shows up.
    pending_rename: Option<ItemIdList>,
}

fn dispatcher<T: Send + 'static>(
    kind: TaskKind,
    threads: usize,
    sender: &mpsc::Sender<ViewMessage>,
) -> Result<TaskDispatcher<T>, ViewError> {
    TaskDispatcher::new(kind, threads.max(1), sender.clone()).map_err(|source| ViewError::ThreadPool { kind, source })
}

impl<D: ListDisplay> FolderView<D> {
    pub fn new(namespace: Arc<dyn ShellNamespace>, mut display: D, options: ViewOptions) -> Result<Self, ViewError> {
        let ViewOptions {
            settings,
            global,
            shell_windows,
            icon_extractor,
            thumbnail_extractor,
            watch_changes,
        } = options;

        let (sender, receiver) = mpsc::channel();
        let column_tasks = dispatcher(TaskKind::Column, global.column_threads, &sender)?;
        let icon_tasks = dispatcher(TaskKind::Icon, global.icon_threads, &sender)?;
        let thumbnail_tasks = dispatcher(TaskKind::Thumbnail, global.thumbnail_threads, &sender)?;
        let info_tip_tasks = dispatcher(TaskKind::InfoTip, global.info_tip_threads, &sender)?;

        let icon_extractor: Arc<dyn IconExtractor> = match icon_extractor {
            Some(extractor) => extractor,
            None => Arc::new(PlaceholderIconExtractor::new(Arc::clone(&namespace))),
        };
        let thumbnail_extractor: Arc<dyn IconExtractor> = match thumbnail_extractor {
            Some(extractor) => extractor,
            None => Arc::new(ImageThumbnailExtractor::new(Arc::clone(&namespace))),
        };

        display.set_view_mode(settings.view_mode);
        display.set_groups_enabled(settings.show_in_groups);

        let mut store = ItemStore::new();
        store.set_filter(ItemFilter::new(
            settings.filter_text.clone(),
            settings.filter_case_sensitive,
            settings.filter_applied,
        ));

        Ok(Self {
            namespace,
            display,
            store,
            groups: GroupSet::new(),
            columns: global.columns.clone(),
            settings,
            global,
            events: EventBus::new(),
            reconciler: ChangeReconciler::new(sender.clone()),
            sender,
            receiver,
            watch_changes,
            watcher: None,
            pending_watcher: None,
            pending_navigation: None,
            committed: false,
            column_tasks,
            icon_tasks,
            thumbnail_tasks,
            info_tip_tasks,
            icon_extractor,
            thumbnail_extractor,
            icon_cache: IconCache::default(),
            shell_windows: shell_windows.acquire(),
            visible_range: None,
            pending_rename: None,
        })
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Starts showing `folder`. Returns the navigation id carried by the lifecycle events.
    ///
    /// A navigation started while another is in flight supersedes it.
    pub fn navigate(&mut self, folder: ItemIdList) -> Result<Uuid, ViewError> {
        // Whatever is buffered for the folder we're leaving still applies to it
        if !self.reconciler.is_buffering() {
            let changes = self.reconciler.drain(self.store.folder());
            self.apply_changes(changes);
        }

        let params = NavigateParams {
            navigation_id: Uuid::new_v4(),
            folder: folder.clone(),
        };
        log::debug!("FolderView: navigating to {} ({})", folder, params.navigation_id);
        self.events.emit(ViewEvent::NavigationStarted(params.clone()));

        self.reconciler.begin_enumeration();
        self.pending_watcher = self.start_watcher(&folder);

        let spawned = EnumerationJob::spawn(
            Arc::clone(&self.namespace),
            folder,
            self.settings.show_hidden,
            params.navigation_id,
            self.sender.clone(),
        );
        if let Err(e) = spawned {
            log::error!("FolderView: couldn't start enumeration: {}", e);
            self.pending_watcher = None;
            let changes = self.reconciler.abandon_enumeration(self.store.folder());
            self.apply_changes(changes);
            return Err(ViewError::Spawn(e));
        }

        let navigation_id = params.navigation_id;
        self.pending_navigation = Some(params);
        Ok(navigation_id)
    }

    /// Enumerates the displayed folder again.
    pub fn refresh(&mut self) -> Result<Option<Uuid>, ViewError> {
        if !self.committed {
            return Ok(None);
        }
        let folder = self.store.folder().clone();
        self.navigate(folder).map(Some)
    }

    fn start_watcher(&self, folder: &ItemIdList) -> Option<FolderWatcher> {
        if !self.watch_changes {
            return None;
        }
        let path = self.namespace.filesystem_path(folder)?;
        match FolderWatcher::start(&path, folder.clone(), self.reconciler.sink(), self.global.watcher_debounce()) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                log::warn!("FolderView: not watching {}: {}", folder, e);
                None
            }
        }
    }

    fn on_enumeration_completed(&mut self, navigation_id: Uuid, result: Result<Vec<ShellItem>, EnumerationError>) {
        let Some(params) = self
            .pending_navigation
            .take_if(|pending| pending.navigation_id == navigation_id)
        else {
            log::debug!("FolderView: dropping stale enumeration result {}", navigation_id);
            return;
        };

        match result {
            Ok(items) => self.commit(params, items),
            Err(error) => {
                log::info!("FolderView: navigation to {} failed: {}", params.folder, error);
                self.pending_watcher = None;
                let changes = self.reconciler.abandon_enumeration(self.store.folder());
                self.apply_changes(changes);
                self.events.emit(ViewEvent::NavigationFailed { params, error });
            }
        }
    }

    /// Replaces the current epoch with the snapshot in `items`.
    fn commit(&mut self, params: NavigateParams, items: Vec<ShellItem>) {
        let virtual_folder = self.namespace.is_virtual_folder(&params.folder);

        self.clear_tasks();
        self.display.remove_all();
        self.clear_groups();
        self.store.reset(params.folder.clone(), virtual_folder);
        self.watcher = self.pending_watcher.take();
        self.committed = true;
        self.display.set_columns(self.columns.for_folder(virtual_folder));

        let snapshot = |num_items| NavigationSnapshot {
            navigation_id: params.navigation_id,
            folder: params.folder.clone(),
            virtual_folder,
            num_items,
        };
        self.events.emit(ViewEvent::NavigationCommitted(snapshot(items.len())));

        let identities: HashSet<ItemIdList> = items.iter().map(|item| item.absolute_id.clone()).collect();
        for item in items {
            self.store.add_item(item);
        }
        self.insert_awaiting();
        self.shell_windows.notify_navigation(&params.folder);

        let replay = self.reconciler.finish_enumeration(&params.folder, &identities);
        self.apply_changes(replay);
        self.queue_visible_enrichment();

        log::debug!(
            "FolderView: committed {} with {} items ({} shown)",
            params.folder,
            self.store.num_items(),
            self.display.len()
        );
        self.events.emit(ViewEvent::DirectoryModified);
        self.events.emit(ViewEvent::NavigationCompleted(snapshot(self.store.num_items())));
    }

    fn clear_tasks(&mut self) {
        self.column_tasks.clear();
        self.icon_tasks.clear();
        self.thumbnail_tasks.clear();
        self.info_tip_tasks.clear();
    }

    pub fn is_navigating(&self) -> bool {
        self.pending_navigation.is_some()
    }

    /// The folder on display, once a navigation has committed.
    pub fn current_folder(&self) -> Option<&ItemIdList> {
        self.committed.then(|| self.store.folder())
    }

    /// Whether the displayed folder is being watched for changes.
    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    pub fn in_virtual_folder(&self) -> bool {
        self.store.is_virtual_folder()
    }

    // ========================================================================
    // Message queue
    // ========================================================================

    /// Handles everything already queued. Returns how many messages were handled.
    pub fn process_pending_messages(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.receiver.try_recv() {
            self.handle_message(message);
            handled += 1;
        }
        handled
    }

    /// Waits up to `timeout` for one message and handles it. Returns false on timeout.
    pub fn wait_for_message(&mut self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(message) => {
                self.handle_message(message);
                true
            }
            Err(_) => false,
        }
    }

    pub fn handle_message(&mut self, message: ViewMessage) {
        match message {
            ViewMessage::EnumerationCompleted { navigation_id, result } => {
                self.on_enumeration_completed(navigation_id, result);
            }
            ViewMessage::DirectoryAltered => {
                let changes = self.reconciler.drain(self.store.folder());
                self.apply_changes(changes);
            }
            ViewMessage::TaskReady { kind, request_id } => self.on_task_ready(kind, request_id),
        }
    }

    /// Where to push change notifications from sources other than the built-in watcher.
    pub fn change_sink(&self) -> ChangeSink {
        self.reconciler.sink()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    // ========================================================================
    // Sorting, grouping, filtering
    // ========================================================================

    pub fn settings(&self) -> &FolderSettings {
        &self.settings
    }

    pub fn set_sort_mode(&mut self, mode: SortMode) {
        if self.settings.sort_mode != mode {
            self.settings.sort_mode = mode;
            self.resort();
        }
    }

    pub fn set_sort_direction(&mut self, direction: SortDirection) {
        if self.settings.sort_direction != direction {
            self.settings.sort_direction = direction;
            self.resort();
        }
    }

    pub fn set_folders_first(&mut self, folders_first: bool) {
        if self.settings.folders_first != folders_first {
            self.settings.folders_first = folders_first;
            self.resort();
        }
    }

    pub fn set_group_mode(&mut self, mode: SortMode) {
        if self.settings.group_mode != mode {
            self.settings.group_mode = mode;
            self.regroup();
        }
    }

    pub fn set_group_direction(&mut self, direction: SortDirection) {
        if self.settings.group_sort_direction != direction {
            self.settings.group_sort_direction = direction;
            self.regroup();
        }
    }

    pub fn set_show_in_groups(&mut self, show_in_groups: bool) {
        if self.settings.show_in_groups != show_in_groups {
            self.settings.show_in_groups = show_in_groups;
            self.regroup();
        }
    }

    pub fn set_filter_text(&mut self, text: &str) {
        if self.settings.filter_text != text {
            self.settings.filter_text = text.to_string();
            self.apply_filter();
        }
    }

    pub fn set_filter_applied(&mut self, applied: bool) {
        if self.settings.filter_applied != applied {
            self.settings.filter_applied = applied;
            self.apply_filter();
        }
    }

    pub fn set_filter_case_sensitive(&mut self, case_sensitive: bool) {
        if self.settings.filter_case_sensitive != case_sensitive {
            self.settings.filter_case_sensitive = case_sensitive;
            self.apply_filter();
        }
    }

    /// Hidden items are left out during enumeration, so this lists the folder again.
    pub fn set_show_hidden(&mut self, show_hidden: bool) -> Result<Option<Uuid>, ViewError> {
        if self.settings.show_hidden == show_hidden {
            return Ok(None);
        }
        self.settings.show_hidden = show_hidden;
        self.refresh()
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        if self.settings.view_mode == mode {
            return;
        }
        self.settings.view_mode = mode;
        self.display.set_view_mode(mode);
        for position in 0..self.display.len() {
            if let Some(id) = self.display.item_id_at(position) {
                self.refresh_row_image(id);
            }
        }
        self.queue_visible_enrichment();
    }

    // ========================================================================
    // Columns
    // ========================================================================

    pub fn current_columns(&self) -> &[Column] {
        self.columns.for_folder(self.store.is_virtual_folder())
    }

    pub fn set_current_columns(&mut self, columns: Vec<Column>) {
        self.columns.set_for_folder(self.store.is_virtual_folder(), columns);
        self.columns_changed();
    }

    pub fn import_all_columns(&mut self, columns: FolderColumns) {
        self.columns = columns;
        self.columns_changed();
    }

    pub fn export_all_columns(&self) -> FolderColumns {
        self.columns.clone()
    }

    fn columns_changed(&mut self) {
        let columns = self.columns.for_folder(self.store.is_virtual_folder());
        self.display.set_columns(columns);
        self.queue_visible_enrichment();
        self.events.emit(ViewEvent::ColumnsChanged);
    }

    // ========================================================================
    // Selection and editing
    // ========================================================================

    /// Records a selection change the display reported for `position`.
    pub fn on_item_selection_changed(&mut self, position: usize, selected: bool) {
        let Some(id) = self.display.item_id_at(position) else {
            return;
        };
        self.display.set_selected(position, selected);
        if self.store.set_selected(id, selected) {
            self.events.emit(ViewEvent::SelectionChanged);
        }
    }

    /// Starts renaming `identity` as soon as it's displayed (right away if it already is).
    pub fn queue_rename(&mut self, identity: ItemIdList) {
        let position = self
            .store
            .find_by_identity(&identity)
            .and_then(|id| self.display.position_of(id));
        match position {
            Some(position) => self.start_rename(position),
            None => self.pending_rename = Some(identity),
        }
    }

    pub fn start_rename(&mut self, position: usize) {
        let Some(id) = self.display.item_id_at(position) else {
            return;
        };
        if let Some(item) = self.store.get_mut(id) {
            item.editing_name = Some(item.display_name.clone());
            self.display.begin_label_edit(position);
        }
    }

    /// Ends an in-place rename and returns the typed name.
    pub fn end_rename(&mut self, position: usize, text: Option<&str>) -> Option<String> {
        let id = self.display.item_id_at(position)?;
        let item = self.store.get_mut(id)?;
        let edited = item.editing_name.take()?;
        Some(text.map(str::to_string).unwrap_or(edited))
    }

    /// Display positions currently on screen. Enrichment is only queued for these.
    pub fn set_visible_range(&mut self, range: Range<usize>) {
        self.visible_range = Some(range);
        self.queue_visible_enrichment();
    }

    // ========================================================================
    // Lookup and aggregates
    // ========================================================================

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    pub fn item_at(&self, position: usize) -> Option<&ItemInfo> {
        self.display.item_id_at(position).and_then(|id| self.store.get(id))
    }

    /// Display names in display order.
    pub fn displayed_names(&self) -> Vec<String> {
        (0..self.display.len())
            .filter_map(|position| self.item_at(position))
            .map(|item| item.display_name.clone())
            .collect()
    }

    /// Display position of the item named `name`, if it's shown.
    pub fn locate_item_by_name(&self, name: &str) -> Option<usize> {
        let id = self.store.find_by_name(name)?;
        self.display.position_of(id)
    }

    pub fn num_items(&self) -> usize {
        self.store.num_items()
    }

    pub fn num_visible_items(&self) -> usize {
        self.store.num_visible()
    }

    pub fn num_selected_files(&self) -> usize {
        self.store.num_selected_files()
    }

    pub fn num_selected_folders(&self) -> usize {
        self.store.num_selected_folders()
    }

    pub fn total_directory_size(&self) -> u64 {
        self.store.total_size()
    }

    pub fn selection_size(&self) -> u64 {
        self.store.selection_size()
    }

    pub fn visible_size(&self) -> u64 {
        self.store.visible_size()
    }
}
