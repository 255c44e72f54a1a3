use std::{collections::HashMap, str::FromStr};

use super::error::TypeError;

/// Decoded query string. Keys may repeat (`?tags=lunch&tags=dinner`).
#[derive(Debug, Default, Clone)]
pub struct Form {
    inner: HashMap<String, Vec<String>>,
}

impl Form {
    pub fn from_query(raw: &str) -> Self {
        let mut inner: HashMap<String, Vec<String>> = HashMap::new();
        url::form_urlencoded::parse(raw.as_bytes()).for_each(|(key, value)| {
            inner
                .entry(key.into_owned())
                .or_default()
                .push(value.into_owned())
        });

        Self { inner }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.inner
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.inner
            .get(key)
            .map(|values| values.iter().filter(|v| !v.is_empty()).cloned().collect())
            .unwrap_or_default()
    }

    pub fn get_number<T>(&self, key: &str) -> Result<Option<T>, TypeError>
    where
        T: FromStr,
    {
        match self.get_str(key) {
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_e| TypeError::new(key, "Expected a number")),
            None => Ok(None),
        }
    }

    /// `1`/`true` switch a flag on; anything else leaves it off.
    pub fn get_flag(&self, key: &str) -> bool {
        matches!(self.get_str(key), Some("1") | Some("true"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_keys_are_collected() {
        let form = Form::from_query("tags=lunch&tags=dinner&author=3");
        assert_eq!(form.get_all("tags"), vec!["lunch", "dinner"]);
        assert_eq!(form.get_number::<i32>("author").unwrap(), Some(3));
    }

    #[test]
    fn percent_encoding_is_decoded() {
        let form = Form::from_query("name=%D1%81%D0%BE%D0%BB%D1%8C&x=a+b");
        assert_eq!(form.get_str("name"), Some("соль"));
        assert_eq!(form.get_str("x"), Some("a b"));
    }

    #[test]
    fn bad_numbers_are_reported_per_field() {
        let form = Form::from_query("page=two");
        let error = form.get_number::<i64>("page").unwrap_err();
        assert_eq!(error.to_string(), "page: Expected a number");
    }

    #[test]
    fn missing_and_empty_values_are_absent() {
        let form = Form::from_query("limit=&is_favorited=0");
        assert_eq!(form.get_number::<i64>("limit").unwrap(), None);
        assert_eq!(form.get_number::<i64>("page").unwrap(), None);
        assert!(!form.get_flag("is_favorited"));
        assert!(Form::from_query("is_in_shopping_cart=1").get_flag("is_in_shopping_cart"));
    }
}
