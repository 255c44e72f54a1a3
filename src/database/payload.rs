use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::{
    error::{Error, FieldErrors},
    schema::Id,
    AMOUNT_MAX, AMOUNT_MIN, COOKING_TIME_MAX, COOKING_TIME_MIN, EMAIL_MAX_LENGTH,
    FORBIDDEN_USERNAME, PASSWORD_MAX_LENGTH, PERSON_NAME_MAX_LENGTH, RECIPE_NAME_MAX_LENGTH,
    TAG_FIELD_MAX_LENGTH, USERNAME_MAX_LENGTH,
};

static USERNAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid regex"));
static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"));
static SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid regex"));
static COLOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid regex"));

const REQUIRED: &str = "This field is required.";

/// Collects every field problem before failing, so callers see all of them at once.
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    pub fn required(&mut self, field: &str, value: Option<String>) -> Option<String> {
        match value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty()) {
            Some(value) => Some(value),
            None => {
                self.error(field, REQUIRED);
                None
            }
        }
    }

    pub fn max_length(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.error(field, format!("Ensure this field has no more than {max} characters."));
        }
    }

    pub fn finish(self) -> Result<(), Error> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self.errors))
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct NewUser {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl NewUser {
    pub fn validate(self) -> Result<Registration, Error> {
        let mut v = Validator::default();

        let email = v.required("email", self.email);
        if let Some(email) = &email {
            v.max_length("email", email, EMAIL_MAX_LENGTH);
            if !EMAIL.is_match(email) {
                v.error("email", "Enter a valid email address.");
            }
        }

        let username = v.required("username", self.username);
        if let Some(username) = &username {
            v.max_length("username", username, USERNAME_MAX_LENGTH);
            if !USERNAME.is_match(username) {
                v.error(
                    "username",
                    "Only letters, digits and @/./+/-/_ are allowed.",
                );
            }
            if username.eq_ignore_ascii_case(FORBIDDEN_USERNAME) {
                v.error("username", format!("Username \"{FORBIDDEN_USERNAME}\" is reserved."));
            }
        }

        let first_name = v.required("first_name", self.first_name);
        if let Some(first_name) = &first_name {
            v.max_length("first_name", first_name, PERSON_NAME_MAX_LENGTH);
        }

        let last_name = v.required("last_name", self.last_name);
        if let Some(last_name) = &last_name {
            v.max_length("last_name", last_name, PERSON_NAME_MAX_LENGTH);
        }

        let password = v.required("password", self.password);
        if let Some(password) = &password {
            v.max_length("password", password, PASSWORD_MAX_LENGTH);
        }

        v.finish()?;

        Ok(Registration {
            email: email.unwrap_or_default(),
            username: username.unwrap_or_default(),
            first_name: first_name.unwrap_or_default(),
            last_name: last_name.unwrap_or_default(),
            password: password.unwrap_or_default(),
        })
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    pub fn validate(self) -> Result<(String, String), Error> {
        let mut v = Validator::default();
        let email = v.required("email", self.email);
        let password = v.required("password", self.password);
        v.finish()?;

        Ok((email.unwrap_or_default(), password.unwrap_or_default()))
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct PasswordChange {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

impl PasswordChange {
    pub fn validate(self) -> Result<(String, String), Error> {
        let mut v = Validator::default();
        let current = v.required("current_password", self.current_password);
        let new = v.required("new_password", self.new_password);
        if let Some(new) = &new {
            v.max_length("new_password", new, PASSWORD_MAX_LENGTH);
        }
        v.finish()?;

        Ok((current.unwrap_or_default(), new.unwrap_or_default()))
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct NewTag {
    pub name: Option<String>,
    pub color: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ValidTag {
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl NewTag {
    pub fn validate(self) -> Result<ValidTag, Error> {
        let mut v = Validator::default();

        let name = v.required("name", self.name);
        if let Some(name) = &name {
            v.max_length("name", name, TAG_FIELD_MAX_LENGTH);
        }

        let color = v.required("color", self.color);
        if let Some(color) = &color {
            if !COLOR.is_match(color) {
                v.error("color", "Enter a hex color such as #E26C2D.");
            }
        }

        let slug = v.required("slug", self.slug);
        if let Some(slug) = &slug {
            v.max_length("slug", slug, TAG_FIELD_MAX_LENGTH);
            if !SLUG.is_match(slug) {
                v.error("slug", "Only letters, digits, hyphens and underscores are allowed.");
            }
        }

        v.finish()?;

        Ok(ValidTag {
            name: name.unwrap_or_default(),
            color: color.map(|c| c.to_uppercase()).unwrap_or_default(),
            slug: slug.unwrap_or_default(),
        })
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct IngredientAmount {
    pub id: Id,
    pub amount: i64,
}

#[derive(Deserialize, Debug, Default)]
pub struct RecipeForm {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ValidRecipe {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub tags: Vec<Id>,
    pub ingredients: Vec<(Id, i32)>,
    pub image: Option<String>,
}

impl RecipeForm {
    /// Shape checks that need no store access. Whether the referenced
    /// ingredients and tags exist is checked by the recipe actions.
    pub fn validate(self, require_image: bool) -> Result<ValidRecipe, Error> {
        let mut v = Validator::default();

        let name = v.required("name", self.name);
        if let Some(name) = &name {
            v.max_length("name", name, RECIPE_NAME_MAX_LENGTH);
        }

        let text = v.required("text", self.text);

        let cooking_time = match self.cooking_time {
            Some(t) if (COOKING_TIME_MIN..=COOKING_TIME_MAX).contains(&t) => t as i32,
            Some(_) => {
                v.error(
                    "cooking_time",
                    format!("Cooking time must be between {COOKING_TIME_MIN} and {COOKING_TIME_MAX} minutes."),
                );
                0
            }
            None => {
                v.error("cooking_time", REQUIRED);
                0
            }
        };

        let ingredients = self.ingredients.unwrap_or_default();
        if ingredients.is_empty() {
            v.error("ingredients", "Add at least one ingredient.");
        }
        let mut seen = HashSet::new();
        let mut valid_ingredients = Vec::with_capacity(ingredients.len());
        for item in ingredients {
            if !(AMOUNT_MIN..=AMOUNT_MAX).contains(&item.amount) {
                v.error(
                    "ingredients",
                    format!("Amount for ingredient {} must be at least {AMOUNT_MIN}.", item.id),
                );
                continue;
            }
            if !seen.insert(item.id) {
                v.error(
                    "ingredients",
                    format!("Ingredient {} is listed more than once.", item.id),
                );
                continue;
            }
            valid_ingredients.push((item.id, item.amount as i32));
        }

        let tags = self.tags.unwrap_or_default();
        if tags.is_empty() {
            v.error("tags", "Add at least one tag.");
        }
        let mut seen = HashSet::new();
        if tags.iter().any(|tag| !seen.insert(*tag)) {
            v.error("tags", "Tags must not repeat.");
        }

        let image = self.image.filter(|image| !image.trim().is_empty());
        if require_image && image.is_none() {
            v.error("image", REQUIRED);
        }

        v.finish()?;

        Ok(ValidRecipe {
            name: name.unwrap_or_default(),
            text: text.unwrap_or_default(),
            cooking_time,
            tags,
            ingredients: valid_ingredients,
            image,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn field_errors(error: Error) -> FieldErrors {
        match error {
            Error::Validation(errors) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    fn recipe(value: serde_json::Value) -> RecipeForm {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn complete_recipe_passes() {
        let form = recipe(json!({
            "name": "Pancakes",
            "text": "Mix and fry",
            "cooking_time": 20,
            "tags": [1, 2],
            "ingredients": [{"id": 4, "amount": 200}, {"id": 5, "amount": 2}],
            "image": "data:image/png;base64,iVBORw0KGgo="
        }));

        let valid = form.validate(true).unwrap();
        assert_eq!(valid.cooking_time, 20);
        assert_eq!(valid.ingredients, vec![(4, 200), (5, 2)]);
        assert_eq!(valid.tags, vec![1, 2]);
    }

    #[test]
    fn every_problem_is_reported() {
        let form = recipe(json!({
            "name": "",
            "cooking_time": 0,
            "tags": [1, 1],
            "ingredients": [{"id": 4, "amount": 0}, {"id": 5, "amount": 1}, {"id": 5, "amount": 3}]
        }));

        let errors = field_errors(form.validate(true).unwrap_err());
        for field in ["name", "text", "cooking_time", "tags", "ingredients", "image"] {
            assert!(errors.contains_key(field), "missing error for {field}");
        }
        assert_eq!(errors["ingredients"].len(), 2);
    }

    #[test]
    fn cooking_time_bounds_are_inclusive() {
        let base = |time: i64| {
            recipe(json!({
                "name": "Tea", "text": "Steep", "cooking_time": time,
                "tags": [1], "ingredients": [{"id": 1, "amount": 1}]
            }))
            .validate(false)
        };
        assert!(base(1).is_ok());
        assert!(base(600).is_ok());
        assert!(base(601).is_err());
    }

    #[test]
    fn image_is_optional_on_update() {
        let form = recipe(json!({
            "name": "Tea", "text": "Steep", "cooking_time": 5,
            "tags": [1], "ingredients": [{"id": 1, "amount": 1}]
        }));
        assert!(form.validate(false).unwrap().image.is_none());
    }

    #[test]
    fn reserved_and_malformed_usernames_fail() {
        let user = NewUser {
            email: Some("cook@example.com".into()),
            username: Some("me".into()),
            first_name: Some("Ann".into()),
            last_name: Some("Lee".into()),
            password: Some("secret-pass".into()),
        };
        let errors = field_errors(user.validate().unwrap_err());
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["username"]);

        let user = NewUser {
            email: Some("not-an-email".into()),
            username: Some("bad name!".into()),
            ..Default::default()
        };
        let errors = field_errors(user.validate().unwrap_err());
        assert!(errors.contains_key("email"));
        assert!(errors.contains_key("username"));
        assert!(errors.contains_key("password"));
    }

    #[test]
    fn tag_color_is_normalized() {
        let tag = NewTag {
            name: Some("Breakfast".into()),
            color: Some("#e26c2d".into()),
            slug: Some("breakfast".into()),
        };
        assert_eq!(tag.validate().unwrap().color, "#E26C2D");

        let tag = NewTag {
            name: Some("Lunch".into()),
            color: Some("orange".into()),
            slug: Some("lunch time".into()),
        };
        let errors = field_errors(tag.validate().unwrap_err());
        assert!(errors.contains_key("color"));
        assert!(errors.contains_key("slug"));
    }
}
