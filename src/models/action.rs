use crate::models::geometry::Axes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which windows a centring action applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowTarget {
    /// First window of the frontmost application
    ActiveWindow,
    /// Every on-screen, layer-zero window
    VisibleWindows,
}

/// A centring action bound to a hot key and a menu item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CentreAction {
    pub target: WindowTarget,
    pub axes: Axes,
}

impl CentreAction {
    pub const CENTRE_ACTIVE: CentreAction = CentreAction::new(WindowTarget::ActiveWindow, Axes::BOTH);
    pub const CENTRE_VISIBLE: CentreAction =
        CentreAction::new(WindowTarget::VisibleWindows, Axes::BOTH);
    pub const CENTRE_ACTIVE_HORIZONTALLY: CentreAction =
        CentreAction::new(WindowTarget::ActiveWindow, Axes::HORIZONTAL);
    pub const CENTRE_VISIBLE_HORIZONTALLY: CentreAction =
        CentreAction::new(WindowTarget::VisibleWindows, Axes::HORIZONTAL);
    pub const CENTRE_ACTIVE_VERTICALLY: CentreAction =
        CentreAction::new(WindowTarget::ActiveWindow, Axes::VERTICAL);
    pub const CENTRE_VISIBLE_VERTICALLY: CentreAction =
        CentreAction::new(WindowTarget::VisibleWindows, Axes::VERTICAL);

    /// All actions in menu order
    pub const ALL: [CentreAction; 6] = [
        Self::CENTRE_ACTIVE,
        Self::CENTRE_VISIBLE,
        Self::CENTRE_ACTIVE_HORIZONTALLY,
        Self::CENTRE_VISIBLE_HORIZONTALLY,
        Self::CENTRE_ACTIVE_VERTICALLY,
        Self::CENTRE_VISIBLE_VERTICALLY,
    ];

    pub const fn new(target: WindowTarget, axes: Axes) -> Self {
        Self { target, axes }
    }

    /// Stable identifier used in the preferences file and on the command line
    pub fn name(&self) -> &'static str {
        match (self.target, self.axis_label()) {
            (WindowTarget::ActiveWindow, AxisLabel::Both) => "centre-active",
            (WindowTarget::VisibleWindows, AxisLabel::Both) => "centre-visible",
            (WindowTarget::ActiveWindow, AxisLabel::Horizontal) => "centre-active-horizontally",
            (WindowTarget::VisibleWindows, AxisLabel::Horizontal) => {
                "centre-visible-horizontally"
            }
            (WindowTarget::ActiveWindow, AxisLabel::Vertical) => "centre-active-vertically",
            (WindowTarget::VisibleWindows, AxisLabel::Vertical) => "centre-visible-vertically",
            (WindowTarget::ActiveWindow, AxisLabel::None) => "noop-active",
            (WindowTarget::VisibleWindows, AxisLabel::None) => "noop-visible",
        }
    }

    /// Menu item title
    pub fn title(&self) -> String {
        let subject = match self.target {
            WindowTarget::ActiveWindow => "Active Window",
            WindowTarget::VisibleWindows => "Visible Windows",
        };

        match self.axis_label() {
            AxisLabel::Both | AxisLabel::None => format!("Centre {}", subject),
            AxisLabel::Horizontal => format!("Horizontally Centre {}", subject),
            AxisLabel::Vertical => format!("Vertically Centre {}", subject),
        }
    }

    fn axis_label(&self) -> AxisLabel {
        if self.axes == Axes::BOTH {
            AxisLabel::Both
        } else if self.axes == Axes::HORIZONTAL {
            AxisLabel::Horizontal
        } else if self.axes == Axes::VERTICAL {
            AxisLabel::Vertical
        } else {
            AxisLabel::None
        }
    }
}

enum AxisLabel {
    Both,
    Horizontal,
    Vertical,
    None,
}

impl fmt::Display for CentreAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CentreAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace("center", "centre");
        CentreAction::ALL
            .into_iter()
            .find(|action| action.name() == normalized)
            .ok_or_else(|| format!("Unknown centring action: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for action in CentreAction::ALL {
            assert_eq!(action.name().parse::<CentreAction>().unwrap(), action);
        }
    }

    #[test]
    fn american_spelling_is_accepted() {
        let action: CentreAction = "center-active-vertically".parse().unwrap();
        assert_eq!(action, CentreAction::CENTRE_ACTIVE_VERTICALLY);
        assert!("centre-everything".parse::<CentreAction>().is_err());
    }

    #[test]
    fn titles_match_menu_wording() {
        assert_eq!(CentreAction::CENTRE_ACTIVE.title(), "Centre Active Window");
        assert_eq!(
            CentreAction::CENTRE_VISIBLE_HORIZONTALLY.title(),
            "Horizontally Centre Visible Windows"
        );
        assert_eq!(
            CentreAction::CENTRE_ACTIVE_VERTICALLY.title(),
            "Vertically Centre Active Window"
        );
    }
}
