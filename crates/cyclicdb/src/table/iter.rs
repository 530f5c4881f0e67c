//! Forward iteration over a table's occupied index range.

use crate::error::Error;
use crate::record::Record;

use super::{Backend, Table, TableOps};

/// Forward iterator over `[min_index, max_index]`, materialising a record
/// on each advance.
///
/// Invalidated by any structural mutation made to the table while the
/// iterator is alive; this case is left unspecified, so this type makes no
/// attempt to detect it.
pub struct Iter<'a, B: Backend> {
    table: &'a Table<B>,
    next: Option<u32>,
    last: u32,
}

impl<'a, B: Backend> Iter<'a, B> {
    pub(crate) fn new(table: &'a Table<B>) -> Self {
        match (table.min_index(), table.max_index()) {
            (Some(min), Some(max)) => Iter {
                table,
                next: Some(min),
                last: max,
            },
            _ => Iter {
                table,
                next: None,
                last: 0,
            },
        }
    }
}

impl<'a, B: Backend> Iterator for Iter<'a, B> {
    type Item = Result<Record, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next?;
        self.next = if index == self.last { None } else { Some(index + 1) };
        match self.table.get(index) {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl<B: Backend> Table<B> {
    /// Forward iterator over every currently occupied index, in order.
    pub fn iter(&self) -> Iter<'_, B> {
        Iter::new(self)
    }
}

#[cfg(test)]
mod tests {
    use crate::table::field::Schema;
    use crate::table::memory::MemoryTable;
    use crate::table::{Config, TableOps};
    use crate::value::{DataType, Value};

    fn schema() -> Schema {
        Schema::new([("a".to_string(), DataType::I32)]).unwrap()
    }

    #[test]
    fn iterates_occupied_range_in_order() {
        let table = MemoryTable::create(Config::new(schema(), 3).unwrap()).unwrap();
        for i in 0..5 {
            let mut rec = table.new_record();
            rec.set(0, Value::I32(i));
            table.append(None, &rec).unwrap();
        }
        let values: Vec<i32> = table
            .iter()
            .map(|r| r.unwrap().get(0).get::<i32>().unwrap())
            .collect();
        assert_eq!(values, vec![2, 3, 4]);
    }

    #[test]
    fn empty_table_iterates_nothing() {
        let table = MemoryTable::create(Config::new(schema(), 3).unwrap()).unwrap();
        assert_eq!(table.iter().count(), 0);
    }
}
