use std::collections::BTreeMap;

use crate::domain::{Item, ItemCreate, Order, OrderCreate};

/// A record kept in a [`Table`]. Ids are assigned by the table.
pub trait Entity: Clone + Send + Sync + 'static {
    type CreatePayload: Send;

    /// Construct the full entity from the assigned id and payload.
    fn from_create(id: i64, payload: Self::CreatePayload) -> Self;
}

impl Entity for Order {
    type CreatePayload = OrderCreate;

    fn from_create(id: i64, payload: OrderCreate) -> Self {
        Order::from_create(id, payload)
    }
}

impl Entity for Item {
    type CreatePayload = ItemCreate;

    fn from_create(id: i64, payload: ItemCreate) -> Self {
        Item::from_create(id, payload)
    }
}

/// Rows keyed by a monotonically increasing id, so iteration order is
/// insertion order.
pub struct Table<T: Entity> {
    rows: BTreeMap<i64, T>,
    next_id: i64,
}

impl<T: Entity> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T: Entity> Table<T> {
    pub fn insert(&mut self, payload: T::CreatePayload) -> &T {
        let id = self.next_id;
        self.next_id += 1;
        self.rows.entry(id).or_insert_with(|| T::from_create(id, payload))
    }

    pub fn get(&self, id: i64) -> Option<&T> {
        self.rows.get(&id)
    }

    pub fn get_mut(&mut self, id: i64) -> Option<&mut T> {
        self.rows.get_mut(&id)
    }

    pub fn remove(&mut self, id: i64) -> Option<T> {
        self.rows.remove(&id)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.rows.values_mut()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(name: &str) -> ItemCreate {
        ItemCreate {
            order_id: 1,
            user_id: 1,
            user_name: "Ann".into(),
            name: name.into(),
            quantity: 1,
        }
    }

    #[test]
    fn test_ids_increase_and_are_not_reused() {
        let mut table: Table<Item> = Table::default();
        let a = table.insert(payload("a")).id;
        let b = table.insert(payload("b")).id;
        assert_eq!((a, b), (1, 2));

        table.remove(b);
        let c = table.insert(payload("c")).id;
        assert_eq!(c, 3);

        let names: Vec<&str> = table.values().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(table.len(), 2);
    }
}
