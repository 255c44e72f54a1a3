pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const USER_COUNT_PER_PAGE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const COOKING_TIME_MIN: i64 = 1;
pub const COOKING_TIME_MAX: i64 = 600;
pub const AMOUNT_MIN: i64 = 1;
pub const AMOUNT_MAX: i64 = i32::MAX as i64;

pub const RECIPE_NAME_MAX_LENGTH: usize = 200;
pub const INGREDIENT_FIELD_MAX_LENGTH: usize = 200;
pub const TAG_FIELD_MAX_LENGTH: usize = 200;

pub const EMAIL_MAX_LENGTH: usize = 254;
pub const USERNAME_MAX_LENGTH: usize = 150;
pub const PERSON_NAME_MAX_LENGTH: usize = 150;
pub const PASSWORD_MAX_LENGTH: usize = 150;
pub const FORBIDDEN_USERNAME: &str = "me";

pub const SHOPPING_LIST_HEADER: &str = "Shopping list:";
pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";

pub const RECIPE_IMAGE_DIR: &str = "recipes/images";
pub const MEDIA_URL_PREFIX: &str = "/media";
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

pub const INGREDIENT_IMPORT_CHUNK: usize = 1000;
pub const MAX_JSON_BODY: u64 = 16 * 1024 * 1024;
