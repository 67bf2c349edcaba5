//! Status bar menu
//!
//! The menu is described by a portable [`MenuModel`] and driven by a
//! [`MenuController`]; `StatusBarMenu` renders it with AppKit on macOS.

use crate::config::{PreferencesHandle, PreferencesStore};
use crate::models::action::CentreAction;
use crate::models::shortcut::{HotKeyBinding, Key, ModifierKey, ShortcutCombination};
use crate::permissions::PermissionChecker;
use crate::services::centring::WindowCentrer;
use crate::services::launch_on_login::LaunchAtLogin;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const VISIBLE_FRAME_TITLE: &str = "Account for Dock & Menu Bar";
pub const LAUNCH_AT_LOGIN_TITLE: &str = "Launch on Login";
pub const VERIFY_PERMISSION_TITLE: &str = "Verify Permission";
pub const QUIT_TITLE: &str = "Quit";

const TAG_TOGGLE_VISIBLE_FRAME: isize = 100;
const TAG_TOGGLE_LAUNCH_AT_LOGIN: isize = 101;
const TAG_VERIFY_PERMISSION: isize = 102;
const TAG_QUIT: isize = 103;

/// Something the user can choose from the menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    Centre(CentreAction),
    ToggleVisibleFrame,
    ToggleLaunchAtLogin,
    VerifyPermission,
    Quit,
}

impl MenuCommand {
    /// Integer stored in `NSMenuItem.tag`
    pub fn tag(self) -> isize {
        match self {
            MenuCommand::Centre(action) => CentreAction::ALL
                .iter()
                .position(|candidate| *candidate == action)
                .map(|index| index as isize)
                .unwrap_or(-1),
            MenuCommand::ToggleVisibleFrame => TAG_TOGGLE_VISIBLE_FRAME,
            MenuCommand::ToggleLaunchAtLogin => TAG_TOGGLE_LAUNCH_AT_LOGIN,
            MenuCommand::VerifyPermission => TAG_VERIFY_PERMISSION,
            MenuCommand::Quit => TAG_QUIT,
        }
    }

    pub fn from_tag(tag: isize) -> Option<Self> {
        match tag {
            TAG_TOGGLE_VISIBLE_FRAME => Some(MenuCommand::ToggleVisibleFrame),
            TAG_TOGGLE_LAUNCH_AT_LOGIN => Some(MenuCommand::ToggleLaunchAtLogin),
            TAG_VERIFY_PERMISSION => Some(MenuCommand::VerifyPermission),
            TAG_QUIT => Some(MenuCommand::Quit),
            index => usize::try_from(index)
                .ok()
                .and_then(|index| CentreAction::ALL.get(index))
                .map(|action| MenuCommand::Centre(*action)),
        }
    }

    /// Commands that need accessibility permission
    pub fn requires_permission(self) -> bool {
        matches!(
            self,
            MenuCommand::Centre(_) | MenuCommand::ToggleVisibleFrame | MenuCommand::ToggleLaunchAtLogin
        )
    }
}

/// A clickable menu row
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    pub command: MenuCommand,
    pub title: String,
    /// Single-character key equivalent, empty when none
    pub key_equivalent: String,
    /// `NSEventModifierFlags` for the key equivalent
    pub modifier_mask: u64,
    pub checked: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MenuEntry {
    Item(MenuItem),
    Separator,
}

/// State the menu reflects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuState {
    pub permission_granted: bool,
    pub visible_frame_only: bool,
    pub launch_at_login: bool,
}

/// Ordered menu contents
#[derive(Debug, Clone, PartialEq)]
pub struct MenuModel {
    entries: Vec<MenuEntry>,
}

impl MenuModel {
    pub fn build(state: MenuState, bindings: &[HotKeyBinding]) -> Self {
        let shortcut_for = |action: CentreAction| {
            bindings
                .iter()
                .find(|binding| binding.action == action)
                .map(|binding| binding.shortcut.clone())
        };

        let mut entries = Vec::new();

        // Actions come in active/visible pairs, one pair per axis selection
        for pair in CentreAction::ALL.chunks(2) {
            for action in pair {
                entries.push(MenuEntry::Item(item(
                    MenuCommand::Centre(*action),
                    action.title(),
                    shortcut_for(*action).as_ref(),
                    false,
                    state.permission_granted,
                )));
            }
            entries.push(MenuEntry::Separator);
        }

        entries.push(MenuEntry::Item(item(
            MenuCommand::ToggleVisibleFrame,
            VISIBLE_FRAME_TITLE.to_string(),
            None,
            state.visible_frame_only,
            state.permission_granted,
        )));
        entries.push(MenuEntry::Item(item(
            MenuCommand::ToggleLaunchAtLogin,
            LAUNCH_AT_LOGIN_TITLE.to_string(),
            None,
            state.launch_at_login,
            state.permission_granted,
        )));
        entries.push(MenuEntry::Separator);

        entries.push(MenuEntry::Item(item(
            MenuCommand::VerifyPermission,
            VERIFY_PERMISSION_TITLE.to_string(),
            None,
            false,
            true,
        )));
        entries.push(MenuEntry::Separator);

        let quit = ShortcutCombination::new(vec![ModifierKey::Command], Key::Letter('q'));
        entries.push(MenuEntry::Item(item(
            MenuCommand::Quit,
            QUIT_TITLE.to_string(),
            Some(&quit),
            false,
            true,
        )));

        Self { entries }
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    pub fn items(&self) -> impl Iterator<Item = &MenuItem> {
        self.entries.iter().filter_map(|entry| match entry {
            MenuEntry::Item(item) => Some(item),
            MenuEntry::Separator => None,
        })
    }

    pub fn item(&self, command: MenuCommand) -> Option<&MenuItem> {
        self.items().find(|item| item.command == command)
    }
}

fn item(
    command: MenuCommand,
    title: String,
    shortcut: Option<&ShortcutCombination>,
    checked: bool,
    enabled: bool,
) -> MenuItem {
    MenuItem {
        command,
        title,
        key_equivalent: shortcut
            .map(|shortcut| shortcut.key.key_equivalent())
            .unwrap_or_default(),
        modifier_mask: shortcut.map(|shortcut| shortcut.cocoa_modifiers()).unwrap_or(0),
        checked,
        enabled,
    }
}

/// What the run loop should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOutcome {
    Continue,
    Quit,
}

/// Carries out menu commands
pub struct MenuController {
    centrer: Arc<WindowCentrer>,
    permissions: Arc<PermissionChecker>,
    preferences: PreferencesHandle,
    store: PreferencesStore,
    launch_at_login: Option<LaunchAtLogin>,
    bindings: Vec<HotKeyBinding>,
}

impl MenuController {
    pub fn new(
        centrer: Arc<WindowCentrer>,
        permissions: Arc<PermissionChecker>,
        preferences: PreferencesHandle,
        store: PreferencesStore,
        launch_at_login: Option<LaunchAtLogin>,
        bindings: Vec<HotKeyBinding>,
    ) -> Self {
        Self {
            centrer,
            permissions,
            preferences,
            store,
            launch_at_login,
            bindings,
        }
    }

    pub fn state(&self) -> MenuState {
        MenuState {
            permission_granted: self.permissions.is_granted(),
            visible_frame_only: self.preferences.visible_frame_only(),
            launch_at_login: self
                .launch_at_login
                .as_ref()
                .map(LaunchAtLogin::is_enabled)
                .unwrap_or(false),
        }
    }

    pub fn model(&self) -> MenuModel {
        MenuModel::build(self.state(), &self.bindings)
    }

    pub fn handle(&self, command: MenuCommand) -> MenuOutcome {
        if command.requires_permission() && !self.permissions.is_granted() {
            warn!(?command, "Ignoring menu command without accessibility permission");
            return MenuOutcome::Continue;
        }

        match command {
            MenuCommand::Centre(action) => {
                // Failures have already been surfaced through the notifier
                if let Err(err) = self.centrer.perform(action) {
                    debug!(action = %action, "Centring did not complete: {}", err);
                }
            }
            MenuCommand::ToggleVisibleFrame => {
                let enabled = !self.preferences.visible_frame_only();
                self.preferences.set_visible_frame_only(enabled);
                if let Err(err) = self.store.save(&self.preferences.snapshot()) {
                    warn!("Failed to persist preferences: {}", err);
                }
                info!(enabled, "Visible frame preference toggled");
            }
            MenuCommand::ToggleLaunchAtLogin => match &self.launch_at_login {
                Some(agent) => {
                    let enabled = !agent.is_enabled();
                    agent.apply(enabled);
                }
                None => warn!("Launch at login is unavailable"),
            },
            MenuCommand::VerifyPermission => {
                self.permissions.verify();
            }
            MenuCommand::Quit => {
                info!("Quit requested from menu");
                return MenuOutcome::Quit;
            }
        }

        MenuOutcome::Continue
    }
}

#[cfg(target_os = "macos")]
pub use system::StatusBarMenu;

#[cfg(target_os = "macos")]
mod system {
    use super::{MenuCommand, MenuController, MenuEntry, MenuModel, MenuOutcome};
    use crate::{CentreError, Result};
    use cocoa::appkit::{NSApp, NSApplication, NSMenu, NSMenuItem, NSStatusBar, NSStatusItem};
    use cocoa::base::{id, nil, NO, YES};
    use cocoa::foundation::{NSAutoreleasePool, NSString};
    use objc::declare::ClassDecl;
    use objc::runtime::{Class, Object, Sel};
    use objc::{class, msg_send, sel, sel_impl};
    use std::ffi::c_void;
    use std::sync::{Arc, Once};
    use tracing::{debug, info};

    const TARGET_CLASS: &str = "CentreMenuTarget";
    const CONTROLLER_IVAR: &str = "centreController";
    const NS_VARIABLE_STATUS_ITEM_LENGTH: f64 = -1.0;

    /// State reachable from the Objective-C target
    struct Binding {
        controller: Arc<MenuController>,
        menu: id,
    }

    fn target_class() -> Result<&'static Class> {
        static REGISTER: Once = Once::new();
        REGISTER.call_once(|| {
            if let Some(mut decl) = ClassDecl::new(TARGET_CLASS, class!(NSObject)) {
                decl.add_ivar::<*mut c_void>(CONTROLLER_IVAR);
                unsafe {
                    decl.add_method(
                        sel!(menuItemSelected:),
                        menu_item_selected as extern "C" fn(&Object, Sel, id),
                    );
                    decl.add_method(
                        sel!(menuWillOpen:),
                        menu_will_open as extern "C" fn(&Object, Sel, id),
                    );
                }
                decl.register();
            }
        });

        Class::get(TARGET_CLASS).ok_or_else(|| {
            CentreError::MacOSAPIError(format!("Failed to register {}", TARGET_CLASS)).into()
        })
    }

    fn binding(this: &Object) -> Option<&Binding> {
        unsafe {
            let ptr: *mut c_void = *this.get_ivar(CONTROLLER_IVAR);
            (ptr as *const Binding).as_ref()
        }
    }

    extern "C" fn menu_item_selected(this: &Object, _cmd: Sel, sender: id) {
        let Some(binding) = binding(this) else {
            return;
        };

        let tag: isize = unsafe { msg_send![sender, tag] };
        let Some(command) = MenuCommand::from_tag(tag) else {
            debug!(tag, "Menu item without a command");
            return;
        };

        if binding.controller.handle(command) == MenuOutcome::Quit {
            unsafe { NSApp().terminate_(nil) };
            return;
        }
        refresh(binding.menu, &binding.controller.model());
    }

    extern "C" fn menu_will_open(this: &Object, _cmd: Sel, _menu: id) {
        if let Some(binding) = binding(this) {
            refresh(binding.menu, &binding.controller.model());
        }
    }

    /// Sync checkmarks and enabled state with the model
    fn refresh(menu: id, model: &MenuModel) {
        for item in model.items() {
            unsafe {
                let menu_item: id = msg_send![menu, itemWithTag: item.command.tag()];
                if menu_item == nil {
                    continue;
                }
                let state: isize = if item.checked { 1 } else { 0 };
                let _: () = msg_send![menu_item, setState: state];
                let _: () = msg_send![menu_item, setEnabled: if item.enabled { YES } else { NO }];
            }
        }
    }

    /// The Centre status item and its menu
    pub struct StatusBarMenu {
        status_item: id,
        target: id,
        binding: *mut Binding,
    }

    impl StatusBarMenu {
        /// Install the status item. Must be called on the main thread.
        pub fn install(controller: Arc<MenuController>) -> Result<Self> {
            info!("Installing status bar menu...");
            let class = target_class()?;

            unsafe {
                let pool = NSAutoreleasePool::new(nil);

                let status_bar = NSStatusBar::systemStatusBar(nil);
                let status_item = status_bar.statusItemWithLength_(NS_VARIABLE_STATUS_ITEM_LENGTH);
                if status_item == nil {
                    pool.drain();
                    return Err(CentreError::MacOSAPIError(
                        "Failed to create status bar item".to_string(),
                    )
                    .into());
                }
                let _: id = msg_send![status_item, retain];
                set_icon(status_item);

                let target: id = msg_send![class, new];
                let menu: id = NSMenu::new(nil);
                let _: () = msg_send![menu, setAutoenablesItems: NO];
                let _: () = msg_send![menu, setDelegate: target];

                let model = controller.model();
                for entry in model.entries() {
                    let menu_item = match entry {
                        MenuEntry::Separator => NSMenuItem::separatorItem(nil),
                        MenuEntry::Item(item) => {
                            let title = NSString::alloc(nil).init_str(&item.title).autorelease();
                            let key = NSString::alloc(nil)
                                .init_str(&item.key_equivalent)
                                .autorelease();
                            let menu_item = NSMenuItem::alloc(nil)
                                .initWithTitle_action_keyEquivalent_(
                                    title,
                                    sel!(menuItemSelected:),
                                    key,
                                )
                                .autorelease();
                            let _: () = msg_send![menu_item, setTarget: target];
                            let _: () = msg_send![menu_item, setTag: item.command.tag()];
                            let _: () = msg_send![
                                menu_item,
                                setKeyEquivalentModifierMask: item.modifier_mask
                            ];
                            menu_item
                        }
                    };
                    menu.addItem_(menu_item);
                }
                refresh(menu, &model);
                status_item.setMenu_(menu);

                let binding = Box::into_raw(Box::new(Binding { controller, menu }));
                (*target).set_ivar(CONTROLLER_IVAR, binding as *mut c_void);

                pool.drain();
                info!("Status bar menu installed");
                Ok(Self {
                    status_item,
                    target,
                    binding,
                })
            }
        }
    }

    unsafe fn set_icon(status_item: id) {
        let button: id = msg_send![status_item, button];
        if button == nil {
            return;
        }

        let symbol = NSString::alloc(nil).init_str("plus").autorelease();
        let description = NSString::alloc(nil).init_str("Centre").autorelease();
        let image: id = msg_send![
            class!(NSImage),
            imageWithSystemSymbolName: symbol
            accessibilityDescription: description
        ];

        if image != nil {
            let _: () = msg_send![button, setImage: image];
        } else {
            let _: () = msg_send![button, setTitle: description];
        }
    }

    impl Drop for StatusBarMenu {
        fn drop(&mut self) {
            debug!("Removing status bar menu");
            unsafe {
                let status_bar = NSStatusBar::systemStatusBar(nil);
                let _: () = msg_send![status_bar, removeStatusItem: self.status_item];
                let _: () = msg_send![self.status_item, release];
                (*self.target).set_ivar(CONTROLLER_IVAR, std::ptr::null_mut::<c_void>());
                let _: () = msg_send![self.target, release];
                drop(Box::from_raw(self.binding));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preferences;
    use crate::macos::accessibility::{AXWindow, InMemoryAccessibilityProvider};
    use crate::macos::display::{InMemoryDisplayProvider, ScreenInfo};
    use crate::models::geometry::{Point, Rect};
    use crate::permissions::test_support::FakeProbe;
    use crate::ui::alerts::RecordingNotifier;
    use tempfile::TempDir;

    fn state(permission_granted: bool) -> MenuState {
        MenuState {
            permission_granted,
            visible_frame_only: true,
            launch_at_login: false,
        }
    }

    #[test]
    fn model_mirrors_hot_keys_in_menu_order() {
        let model = MenuModel::build(state(true), &HotKeyBinding::defaults());
        let titles: Vec<&str> = model.items().map(|item| item.title.as_str()).collect();

        assert_eq!(
            titles,
            vec![
                "Centre Active Window",
                "Centre Visible Windows",
                "Horizontally Centre Active Window",
                "Horizontally Centre Visible Windows",
                "Vertically Centre Active Window",
                "Vertically Centre Visible Windows",
                VISIBLE_FRAME_TITLE,
                LAUNCH_AT_LOGIN_TITLE,
                VERIFY_PERMISSION_TITLE,
                QUIT_TITLE,
            ]
        );
        let separators = model
            .entries()
            .iter()
            .filter(|entry| matches!(entry, MenuEntry::Separator))
            .count();
        assert_eq!(separators, 5);

        let visible = model
            .item(MenuCommand::Centre(CentreAction::CENTRE_VISIBLE))
            .unwrap();
        assert_eq!(visible.key_equivalent, "0");
        assert_eq!(visible.modifier_mask, (1 << 17) | (1 << 19) | (1 << 20));

        let toggle = model.item(MenuCommand::ToggleVisibleFrame).unwrap();
        assert!(toggle.checked);
        assert!(toggle.key_equivalent.is_empty());
    }

    #[test]
    fn missing_permission_disables_centring_and_toggles() {
        let model = MenuModel::build(state(false), &HotKeyBinding::defaults());

        for item in model.items() {
            assert_eq!(item.enabled, !item.command.requires_permission(), "{}", item.title);
        }
        assert!(model.item(MenuCommand::VerifyPermission).unwrap().enabled);
        assert!(model.item(MenuCommand::Quit).unwrap().enabled);
    }

    #[test]
    fn tags_round_trip_for_every_command() {
        let model = MenuModel::build(state(true), &HotKeyBinding::defaults());
        for item in model.items() {
            assert_eq!(MenuCommand::from_tag(item.command.tag()), Some(item.command));
        }
        assert_eq!(MenuCommand::from_tag(-1), None);
        assert_eq!(MenuCommand::from_tag(6), None);
    }

    struct Fixture {
        _dir: TempDir,
        probe: Arc<FakeProbe>,
        accessibility: Arc<InMemoryAccessibilityProvider>,
        preferences: PreferencesHandle,
        store: PreferencesStore,
        controller: MenuController,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let probe = Arc::new(FakeProbe::default());
        probe.set_trusted(true);
        let permissions = Arc::new(PermissionChecker::new(probe.clone()));
        permissions.verify();

        let accessibility = Arc::new(InMemoryAccessibilityProvider::new_with(vec![AXWindow::new(
            1,
            42,
            "Notes",
            "Notes",
            Rect::new(0.0, 0.0, 400.0, 300.0),
        )]));
        let displays = Arc::new(InMemoryDisplayProvider::new_with(Some(ScreenInfo::new(
            Rect::new(0.0, 0.0, 1920.0, 1080.0),
            Rect::new(0.0, 0.0, 1920.0, 1080.0),
        ))));
        let preferences = PreferencesHandle::new(Preferences::default());
        let store = PreferencesStore::at(dir.path().join("config"));
        let centrer = Arc::new(WindowCentrer::new(
            accessibility.clone(),
            displays,
            Arc::new(RecordingNotifier::new()),
            preferences.clone(),
        ));
        let agent = LaunchAtLogin::new("com.example.centre", dir.path().join("agents"), "/bin/centre");

        let controller = MenuController::new(
            centrer,
            permissions,
            preferences.clone(),
            store.clone(),
            Some(agent),
            HotKeyBinding::defaults(),
        );

        Fixture {
            _dir: dir,
            probe,
            accessibility,
            preferences,
            store,
            controller,
        }
    }

    #[test]
    fn centre_command_moves_window() {
        let f = fixture();
        let outcome = f
            .controller
            .handle(MenuCommand::Centre(CentreAction::CENTRE_ACTIVE));

        assert_eq!(outcome, MenuOutcome::Continue);
        assert_eq!(
            f.accessibility.window(1).unwrap().frame.origin,
            Point::new(760.0, 390.0)
        );
    }

    #[test]
    fn toggling_visible_frame_persists() {
        let f = fixture();
        f.controller.handle(MenuCommand::ToggleVisibleFrame);

        assert!(!f.preferences.visible_frame_only());
        assert!(!f.store.load().unwrap().visible_frame_only);
        assert!(!f.controller.model().item(MenuCommand::ToggleVisibleFrame).unwrap().checked);
    }

    #[test]
    fn toggling_launch_at_login_installs_agent() {
        let f = fixture();
        assert!(!f.controller.state().launch_at_login);

        f.controller.handle(MenuCommand::ToggleLaunchAtLogin);
        assert!(f.controller.state().launch_at_login);

        f.controller.handle(MenuCommand::ToggleLaunchAtLogin);
        assert!(!f.controller.state().launch_at_login);
    }

    #[test]
    fn commands_ignored_until_permission_verified() {
        let f = fixture();
        f.probe.set_trusted(false);
        f.controller.handle(MenuCommand::VerifyPermission);
        assert!(!f.controller.state().permission_granted);

        f.controller.handle(MenuCommand::ToggleVisibleFrame);
        assert!(f.preferences.visible_frame_only());

        f.probe.set_trusted(true);
        f.controller.handle(MenuCommand::VerifyPermission);
        assert!(f.controller.state().permission_granted);
    }

    #[test]
    fn quit_requests_termination() {
        let f = fixture();
        assert_eq!(f.controller.handle(MenuCommand::Quit), MenuOutcome::Quit);
    }
}
