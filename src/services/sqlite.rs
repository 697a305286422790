/// `sqlite` — SQLite access built on `rusqlite`.
///
/// `open` yields a `Connection` record whose `id` keys a registry of live
/// database handles; `execute` runs a statement and reports affected rows,
/// `query` returns rows as hashes keyed by column name. Host failures
/// (unopenable file, bad SQL) are `Err(String)`; a closed or unknown
/// handle is an `Err` as well.
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use rusqlite::types::ValueRef;

use crate::types::checker::Prelude;
use crate::types::env::TypeEnv;
use crate::types::{RecordType, Type};
use crate::value::{Env, RuntimeError, Value};

use super::{arity, define_fn, result_of, str_arg};

thread_local! {
    static CONNECTIONS: RefCell<HashMap<i64, rusqlite::Connection>> =
        RefCell::new(HashMap::new());
    static NEXT_ID: Cell<i64> = Cell::new(1);
}

pub fn register(types: &TypeEnv, values: &Env, prelude: &Prelude) {
    let connection_decl = Rc::new(RecordType {
        name: "Connection".to_string(),
        type_params: vec![],
        fields: RefCell::new(vec![
            ("id".to_string(), Type::Integer),
            ("path".to_string(), Type::Str),
        ]),
    });
    let connection = Type::Record {
        decl: connection_decl,
        type_args: vec![],
    };
    types.define_type("Connection", connection.clone());

    let row = || Type::Hash(Box::new(Type::Str), Box::new(Type::Any));
    define_fn(
        types,
        values,
        "sqlite.open",
        vec![Type::Str],
        result_of(prelude, connection.clone()),
    );
    define_fn(
        types,
        values,
        "sqlite.execute",
        vec![connection.clone(), Type::Str],
        result_of(prelude, Type::Integer),
    );
    define_fn(
        types,
        values,
        "sqlite.query",
        vec![connection.clone(), Type::Str],
        result_of(prelude, Type::Array(Box::new(row()))),
    );
    define_fn(
        types,
        values,
        "sqlite.lastInsertId",
        vec![connection.clone()],
        result_of(prelude, Type::Integer),
    );
    define_fn(
        types,
        values,
        "sqlite.close",
        vec![connection],
        result_of(prelude, Type::Null),
    );
}

pub fn call(name: &str, args: &[Value]) -> Option<Result<Value, RuntimeError>> {
    match name {
        "sqlite.open" => Some(open(args)),
        "sqlite.execute" => Some(execute(args)),
        "sqlite.query" => Some(query(args)),
        "sqlite.lastInsertId" => Some(last_insert_id(args)),
        "sqlite.close" => Some(close(args)),
        _ => None,
    }
}

fn open(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1, "sqlite.open")?;
    let path = str_arg(args, 0, "path")?;
    let conn = match rusqlite::Connection::open(&path) {
        Ok(c) => c,
        Err(e) => return Ok(Value::err(Value::Str(e.to_string()))),
    };
    let id = NEXT_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    });
    CONNECTIONS.with(|conns| conns.borrow_mut().insert(id, conn));
    Ok(Value::ok(Value::Record {
        type_name: "Connection".to_string(),
        fields: Rc::new(RefCell::new(vec![
            ("id".to_string(), Value::Int(id)),
            ("path".to_string(), Value::Str(path)),
        ])),
    }))
}

fn execute(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 2, "sqlite.execute")?;
    let id = connection_id(&args[0])?;
    let sql = str_arg(args, 1, "sql")?;
    with_connection(id, |conn| match conn.execute(&sql, []) {
        Ok(changed) => Value::ok(Value::Int(changed as i64)),
        Err(e) => Value::err(Value::Str(e.to_string())),
    })
}

fn query(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 2, "sqlite.query")?;
    let id = connection_id(&args[0])?;
    let sql = str_arg(args, 1, "sql")?;
    with_connection(id, |conn| match run_query(conn, &sql) {
        Ok(rows) => Value::ok(Value::Array(Rc::new(rows))),
        Err(e) => Value::err(Value::Str(e)),
    })
}

fn last_insert_id(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1, "sqlite.lastInsertId")?;
    let id = connection_id(&args[0])?;
    with_connection(id, |conn| Value::ok(Value::Int(conn.last_insert_rowid())))
}

fn close(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1, "sqlite.close")?;
    let id = connection_id(&args[0])?;
    let removed = CONNECTIONS.with(|conns| conns.borrow_mut().remove(&id));
    Ok(match removed {
        Some(_) => Value::ok(Value::Null),
        None => Value::err(Value::Str("connection is already closed".to_string())),
    })
}

// ─── Private helpers ──────────────────────────────────────────────────────────

fn connection_id(value: &Value) -> Result<i64, RuntimeError> {
    if let Value::Record { type_name, fields } = value {
        if type_name == "Connection" {
            if let Some((_, Value::Int(id))) =
                fields.borrow().iter().find(|(name, _)| name == "id")
            {
                return Ok(*id);
            }
        }
    }
    Err(RuntimeError::msg(
        "sqlite: expected a Connection record from sqlite.open",
    ))
}

fn with_connection(
    id: i64,
    f: impl FnOnce(&rusqlite::Connection) -> Value,
) -> Result<Value, RuntimeError> {
    CONNECTIONS.with(|conns| {
        let conns = conns.borrow();
        Ok(match conns.get(&id) {
            Some(conn) => f(conn),
            None => Value::err(Value::Str("connection is closed".to_string())),
        })
    })
}

fn run_query(conn: &rusqlite::Connection, sql: &str) -> Result<Vec<Value>, String> {
    let mut stmt = conn.prepare(sql).map_err(|e| e.to_string())?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let mut rows = stmt.query([]).map_err(|e| e.to_string())?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(|e| e.to_string())? {
        let mut entries = BTreeMap::new();
        for (i, column) in columns.iter().enumerate() {
            let value = match row.get_ref(i).map_err(|e| e.to_string())? {
                ValueRef::Null => Value::Null,
                ValueRef::Integer(n) => Value::Int(n),
                ValueRef::Real(d) => Value::Double(d),
                ValueRef::Text(bytes) => Value::Str(String::from_utf8_lossy(bytes).into_owned()),
                ValueRef::Blob(bytes) => Value::Str(String::from_utf8_lossy(bytes).into_owned()),
            };
            entries.insert(
                format!("String_{}", column),
                (Value::Str(column.clone()), value),
            );
        }
        out.push(Value::Hash(Rc::new(RefCell::new(entries))));
    }
    Ok(out)
}
