/// Builds a [`Record`](crate::Record) from `name => value` pairs.
///
/// Values go through `Value::from`, so anything with a `From` impl for
/// [`Value`](crate::Value) works, `Option`s included.
///
/// ```rust
/// use serde_flatfile::{record, Value};
///
/// let rec = record! {
///     "id" => 7,
///     "name" => "Alice",
///     "score" => None::<i64>,
/// };
/// assert_eq!(rec.get("id"), Some(&Value::Integer(7)));
/// assert_eq!(rec.get("score"), Some(&Value::Null));
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::Record::new()
    };

    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::Record::new();
        $(
            record.insert(::std::string::ToString::to_string(&$name), $crate::Value::from($value));
        )+
        record
    }};
}
