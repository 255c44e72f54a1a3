//! Shopping list aggregation.
//!
//! Every ingredient line of every recipe in a cart is folded into one line per
//! `(name, measurement_unit)` pair. Units are never converted, so "Milk, ml"
//! and "Milk, l" stay apart. Lines are ordered by the capitalized name, then
//! the raw name, then the unit, which gives the same bytes for the same cart.

use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use serde::Serialize;

use crate::SHOPPING_LIST_HEADER;

/// One ingredient line of one recipe in the cart.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct CartIngredient {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl CartIngredient {
    pub fn new(name: &str, measurement_unit: &str, amount: i32) -> Self {
        Self {
            name: name.to_owned(),
            measurement_unit: measurement_unit.to_owned(),
            amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShoppingList {
    items: Vec<ShoppingListItem>,
}

// (capitalized name, raw name, unit)
type GroupKey = (String, String, String);

impl ShoppingList {
    pub fn aggregate<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = CartIngredient>,
    {
        let mut groups: BTreeMap<GroupKey, i64> = BTreeMap::new();

        for row in rows {
            let key = (capitalize(&row.name), row.name, row.measurement_unit);
            *groups.entry(key).or_insert(0) += i64::from(row.amount);
        }

        let items = groups
            .into_iter()
            .map(|((_, name, measurement_unit), total_amount)| ShoppingListItem {
                name,
                measurement_unit,
                total_amount,
            })
            .collect();

        Self { items }
    }

    pub fn items(&self) -> &[ShoppingListItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// `Shopping list:` followed by `NN. Name - amount unit` lines.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl Display for ShoppingList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{SHOPPING_LIST_HEADER}")?;
        for (i, item) in self.items.iter().enumerate() {
            writeln!(
                f,
                "{:02}. {} - {} {}",
                i + 1,
                capitalize(&item.name),
                item.total_amount,
                item.measurement_unit
            )?;
        }
        Ok(())
    }
}

/// First character upper-cased, the rest lower-cased.
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, unit: &str, total_amount: i64) -> ShoppingListItem {
        ShoppingListItem {
            name: name.to_owned(),
            measurement_unit: unit.to_owned(),
            total_amount,
        }
    }

    #[test]
    fn empty_cart_gives_empty_list() {
        let list = ShoppingList::aggregate(vec![]);
        assert!(list.is_empty());
        assert_eq!(list.render(), "Shopping list:\n");
    }

    #[test]
    fn same_name_and_unit_are_summed() {
        let list = ShoppingList::aggregate(vec![
            CartIngredient::new("flour", "g", 200),
            CartIngredient::new("flour", "g", 150),
        ]);

        assert_eq!(list.items(), &[item("flour", "g", 350)]);
        assert_eq!(list.render(), "Shopping list:\n01. Flour - 350 g\n");
    }

    #[test]
    fn different_units_stay_separate() {
        let list = ShoppingList::aggregate(vec![
            CartIngredient::new("milk", "ml", 200),
            CartIngredient::new("milk", "l", 1),
        ]);

        assert_eq!(list.len(), 2);
        assert_eq!(list.items(), &[item("milk", "l", 1), item("milk", "ml", 200)]);
    }

    #[test]
    fn order_ignores_cart_insertion_order() {
        let recipe_a = vec![
            CartIngredient::new("sugar", "g", 50),
            CartIngredient::new("eggs", "pcs", 2),
        ];
        let recipe_b = vec![
            CartIngredient::new("Butter", "g", 30),
            CartIngredient::new("eggs", "pcs", 1),
        ];

        let forward = ShoppingList::aggregate(recipe_a.iter().chain(&recipe_b).cloned());
        let backward = ShoppingList::aggregate(recipe_b.iter().chain(&recipe_a).cloned());

        assert_eq!(forward, backward);
        assert_eq!(forward.render(), backward.render());
        assert_eq!(
            forward.render(),
            "Shopping list:\n01. Butter - 30 g\n02. Eggs - 3 pcs\n03. Sugar - 50 g\n"
        );
    }

    #[test]
    fn ordering_is_case_normalized() {
        let list = ShoppingList::aggregate(vec![
            CartIngredient::new("zucchini", "g", 1),
            CartIngredient::new("Apple", "pcs", 1),
            CartIngredient::new("banana", "pcs", 1),
        ]);

        let names: Vec<&str> = list.items().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Apple", "banana", "zucchini"]);
    }

    #[test]
    fn differently_cased_names_are_distinct_but_adjacent() {
        let list = ShoppingList::aggregate(vec![
            CartIngredient::new("salt", "g", 5),
            CartIngredient::new("Salt", "g", 3),
        ]);

        assert_eq!(list.items(), &[item("Salt", "g", 3), item("salt", "g", 5)]);
    }

    #[test]
    fn indices_are_zero_padded_below_ten() {
        let rows = (0..11).map(|i| CartIngredient::new(&format!("item{i:02}"), "g", 1));
        let rendered = ShoppingList::aggregate(rows).render();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[1], "01. Item00 - 1 g");
        assert_eq!(lines[9], "09. Item08 - 1 g");
        assert_eq!(lines[10], "10. Item09 - 1 g");
        assert_eq!(lines[11], "11. Item10 - 1 g");
    }

    #[test]
    fn large_totals_do_not_overflow() {
        let list = ShoppingList::aggregate(vec![
            CartIngredient::new("water", "ml", i32::MAX),
            CartIngredient::new("water", "ml", i32::MAX),
        ]);

        assert_eq!(list.items()[0].total_amount, 2 * i64::from(i32::MAX));
    }

    #[test]
    fn capitalize_handles_unicode() {
        assert_eq!(capitalize("мука пшеничная"), "Мука пшеничная");
        assert_eq!(capitalize("OLIVE OIL"), "Olive oil");
        assert_eq!(capitalize(""), "");
    }
}
