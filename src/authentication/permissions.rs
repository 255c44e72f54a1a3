use crate::{error::Error, jwt::SessionData, schema::UserRole};

const USER_ACTIONS: &[ActionType] = &[
    ActionType::ManageOwnProfile,
    ActionType::ManageOwnLists,
    ActionType::ManageOwnSubscriptions,
    ActionType::CreateRecipes,
    ActionType::ManageOwnRecipes,
];

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (UserRole::User, USER_ACTIONS),
    (
        UserRole::Admin,
        &[
            ActionType::ManageOwnProfile,
            ActionType::ManageOwnLists,
            ActionType::ManageOwnSubscriptions,
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageAllRecipes,
            ActionType::ManageTags,
        ],
    ),
];

#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,

    ManageOwnProfile,
    ManageOwnLists,
    ManageOwnSubscriptions,
    ManageOwnRecipes,

    ManageAllRecipes,
    ManageTags,
}

impl ActionType {
    pub fn authenticate(self, session: &SessionData) -> bool {
        ACTION_TABLE
            .iter()
            .find_map(|(role, actions)| {
                if &session.role != role {
                    return None;
                }

                Some(actions.contains(&self))
            })
            .unwrap_or(false)
    }
}

/// Authors may change their own recipes; admins may change any.
pub fn authorize_owner(session: &SessionData, author_id: i32) -> Result<(), Error> {
    session.authenticate(ActionType::ManageOwnRecipes)?;

    if author_id == session.user_id || ActionType::ManageAllRecipes.authenticate(session) {
        Ok(())
    } else {
        Err(Error::Forbidden(
            "You don't have permission to modify this recipe".to_owned(),
        ))
    }
}
