//! Back navigation table

use crate::market::vocabulary;
use crate::market::AdId;
use crate::session::{Operation, Session, Stage};

/// Where "back" leads from the current stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackTarget {
    /// Re-enter a dialogue stage of the same session
    Stage(Stage),
    /// Show the action menu of the ad being edited
    ActionMenu(AdId),
    MainMenu,
    BlacklistMenu,
}

/// Resolve the "back" transition of a session
#[must_use]
pub fn back_target(session: &Session) -> BackTarget {
    use Stage::{
        AwaitAction, AwaitAllSettings, AwaitBlacklistAdd, AwaitBlacklistRemove, AwaitCategory,
        AwaitConfirmation, AwaitDescription, AwaitDuration, AwaitFindAdId, AwaitMode, AwaitPhoto,
        AwaitPremium, AwaitRenewDuration, AwaitSelectAd, AwaitTag, AwaitTitle, AwaitUserId,
        AwaitUsername, Idle,
    };

    if session.from_settings && session.stage.is_field_editor() {
        return BackTarget::Stage(AwaitAllSettings);
    }

    match session.stage {
        AwaitPhoto => match session.operation {
            Operation::Edit => BackTarget::ActionMenu(session.draft.id),
            Operation::Create | Operation::Renew => BackTarget::MainMenu,
        },
        AwaitTitle => BackTarget::Stage(AwaitPhoto),
        AwaitDescription => BackTarget::Stage(AwaitTitle),
        AwaitUserId => BackTarget::Stage(AwaitDescription),
        AwaitUsername | AwaitCategory => BackTarget::Stage(AwaitUserId),
        AwaitMode => BackTarget::Stage(AwaitCategory),
        AwaitTag => {
            let implicit = vocabulary::category(&session.draft.category)
                .and_then(vocabulary::Category::implicit_mode)
                .is_some();
            if implicit {
                BackTarget::Stage(AwaitCategory)
            } else {
                BackTarget::Stage(AwaitMode)
            }
        }
        AwaitDuration => BackTarget::Stage(AwaitTag),
        AwaitPremium => BackTarget::Stage(AwaitDuration),
        AwaitConfirmation => BackTarget::Stage(AwaitPremium),
        AwaitAllSettings => BackTarget::Stage(AwaitConfirmation),
        AwaitRenewDuration => BackTarget::ActionMenu(session.draft.id),
        AwaitBlacklistAdd | AwaitBlacklistRemove => BackTarget::BlacklistMenu,
        AwaitAction | AwaitFindAdId | AwaitSelectAd | Idle => BackTarget::MainMenu,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn at(stage: Stage, operation: Operation) -> Session {
        let mut session = Session::new(1, operation, stage, Default::default(), Utc::now());
        session.draft.id = 77;
        session
    }

    #[test]
    fn test_linear_predecessors() {
        let table = [
            (Stage::AwaitTitle, Stage::AwaitPhoto),
            (Stage::AwaitDescription, Stage::AwaitTitle),
            (Stage::AwaitUserId, Stage::AwaitDescription),
            (Stage::AwaitUsername, Stage::AwaitUserId),
            (Stage::AwaitCategory, Stage::AwaitUserId),
            (Stage::AwaitMode, Stage::AwaitCategory),
            (Stage::AwaitDuration, Stage::AwaitTag),
            (Stage::AwaitPremium, Stage::AwaitDuration),
            (Stage::AwaitConfirmation, Stage::AwaitPremium),
            (Stage::AwaitAllSettings, Stage::AwaitConfirmation),
        ];
        for (from, to) in table {
            assert_eq!(
                back_target(&at(from, Operation::Create)),
                BackTarget::Stage(to),
                "back from {from}"
            );
        }
    }

    #[test]
    fn test_photo_stage_depends_on_operation() {
        assert_eq!(
            back_target(&at(Stage::AwaitPhoto, Operation::Edit)),
            BackTarget::ActionMenu(77)
        );
        assert_eq!(
            back_target(&at(Stage::AwaitPhoto, Operation::Create)),
            BackTarget::MainMenu
        );
    }

    #[test]
    fn test_tag_skips_implicit_mode() {
        let mut session = at(Stage::AwaitTag, Operation::Create);
        session.draft.category = "other".to_string();
        assert_eq!(back_target(&session), BackTarget::Stage(Stage::AwaitCategory));
        session.draft.category = "services".to_string();
        assert_eq!(back_target(&session), BackTarget::Stage(Stage::AwaitMode));
    }

    #[test]
    fn test_editor_from_settings_returns_to_settings() {
        let mut session = at(Stage::AwaitTag, Operation::Edit);
        session.from_settings = true;
        assert_eq!(back_target(&session), BackTarget::Stage(Stage::AwaitAllSettings));
    }

    #[test]
    fn test_side_stages() {
        assert_eq!(
            back_target(&at(Stage::AwaitRenewDuration, Operation::Renew)),
            BackTarget::ActionMenu(77)
        );
        assert_eq!(
            back_target(&at(Stage::AwaitBlacklistRemove, Operation::Create)),
            BackTarget::BlacklistMenu
        );
        assert_eq!(
            back_target(&at(Stage::AwaitSelectAd, Operation::Create)),
            BackTarget::MainMenu
        );
    }
}
