/// Spec tests for the module loader: file resolution, caching, cycles,
/// exposure, impl merging, and the native-module registry.
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use lumen::loader::{LoaderError, ModuleLoader};
use lumen::value::{repr, Value};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Write a throwaway project under the system temp directory.
fn project(files: &[(&str, &str)]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "lumen-spec-{}-{}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    for (name, content) in files {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir failed");
        }
        fs::write(&path, content).expect("write failed");
    }
    dir
}

/// Run `main.lu` in the project and return the value bound to `result`.
fn run_main(files: &[(&str, &str)]) -> Result<Value, LoaderError> {
    let dir = project(files);
    let mut loader = ModuleLoader::new(&dir);
    let module = loader.run_file(&dir.join("main.lu"))?;
    Ok(module
        .value_env
        .get("result")
        .expect("main.lu did not bind `result`"))
}

fn run_main_err(files: &[(&str, &str)]) -> LoaderError {
    let dir = project(files);
    let mut loader = ModuleLoader::new(&dir);
    match loader.run_file(&dir.join("main.lu")) {
        Err(e) => e,
        Ok(_) => panic!("expected a loader error"),
    }
}

// ---------------------------------------------------------------------------
// User modules
// ---------------------------------------------------------------------------

const GEOMETRY: &str = "module geometry exposing (Shape, Square, Circle, area);\n\
                        type Shape = Square(Integer) | Circle(Integer);\n\
                        let area = fn area(s: Shape) -> Integer {\n\
                          match (s) { Square(n) => n * n, Circle(r) => 3 * r * r }\n\
                        };\n\
                        let hidden = 99;\n";

#[test]
fn bare_use_binds_the_module_value() {
    let result = run_main(&[
        ("geometry.lu", GEOMETRY),
        ("main.lu", "use geometry;\nlet result = geometry.area(geometry.Square(5));"),
    ])
    .expect("load failed");
    assert_eq!(result, Value::Int(25));
}

#[test]
fn use_with_alias() {
    let result = run_main(&[
        ("geometry.lu", GEOMETRY),
        ("main.lu", "use geometry as geo;\nlet result = geo.area(geo.Circle(2));"),
    ])
    .expect("load failed");
    assert_eq!(result, Value::Int(12));
}

#[test]
fn use_exposing_binds_names_directly() {
    let result = run_main(&[
        ("geometry.lu", GEOMETRY),
        (
            "main.lu",
            "use geometry exposing (area, Square);\nlet result = area(Square(4));",
        ),
    ])
    .expect("load failed");
    assert_eq!(result, Value::Int(16));
}

#[test]
fn dotted_names_resolve_to_nested_paths() {
    let result = run_main(&[
        (
            "util/text.lu",
            "module text exposing (shout);\nlet shout = fn shout(s: String) -> String : s + \"!\";\n",
        ),
        (
            "main.lu",
            "use util.text exposing (shout);\nlet result = shout(\"hey\");",
        ),
    ])
    .expect("load failed");
    assert_eq!(result, Value::Str("hey!".into()));
}

#[test]
fn unexposed_names_are_rejected() {
    let err = run_main_err(&[
        ("geometry.lu", GEOMETRY),
        ("main.lu", "use geometry exposing (hidden);\nlet result = hidden;"),
    ]);
    assert!(err.to_string().contains("not exposed"), "got: {}", err);
}

#[test]
fn unexposed_member_access_is_rejected() {
    let err = run_main_err(&[
        ("geometry.lu", GEOMETRY),
        ("main.lu", "use geometry;\nlet result = geometry.hidden;"),
    ]);
    assert!(err.to_string().contains("not exposed"), "got: {}", err);
}

#[test]
fn absent_header_exposes_everything() {
    let result = run_main(&[
        ("misc.lu", "let anything = 7;\n"),
        ("main.lu", "use misc exposing (anything);\nlet result = anything;"),
    ])
    .expect("load failed");
    assert_eq!(result, Value::Int(7));
}

#[test]
fn unknown_module_is_a_loader_error() {
    let err = run_main_err(&[("main.lu", "use nowhere;\nlet result = 0;")]);
    assert!(err.to_string().contains("unknown module 'nowhere'"), "got: {}", err);
}

#[test]
fn import_cycles_name_the_chain() {
    let err = run_main_err(&[
        ("main.lu", "use alpha;\nlet result = 0;"),
        ("alpha.lu", "use beta;\n"),
        ("beta.lu", "use alpha;\n"),
    ]);
    let text = err.to_string();
    assert!(text.contains("circular module dependency"), "got: {}", text);
    assert!(text.contains("alpha -> beta -> alpha"), "got: {}", text);
}

#[test]
fn modules_are_cached_per_loader() {
    // `counter.lu` appends to a file at module load time; two imports must
    // only run it once.
    let dir = project(&[
        ("main.lu", "use counter;\nuse counter as again;\nlet result = 1;"),
    ]);
    let marker = dir.join("loaded.txt");
    let counter_src = format!(
        "use fs;\nfs.appendFile({:?}, \"x\");\n",
        marker.to_string_lossy()
    );
    fs::write(dir.join("counter.lu"), counter_src).unwrap();

    let mut loader = ModuleLoader::new(&dir);
    loader.run_file(&dir.join("main.lu")).expect("load failed");
    assert_eq!(fs::read_to_string(&marker).unwrap(), "x");
}

#[test]
fn trait_impls_merge_across_modules() {
    let result = run_main(&[
        (
            "pets.lu",
            "module pets exposing (Dog, describe);\n\
             trait Describe { fn describe(self) -> String; }\n\
             record Dog(name: String);\n\
             impl Describe for Dog { fn describe(self) -> String => \"dog \" + self.name; }\n\
             let describe = fn describe(d: Dog) -> String : d.describe();\n",
        ),
        (
            "main.lu",
            "use pets exposing (Dog);\nlet result = Dog(\"rex\").describe();",
        ),
    ])
    .expect("load failed");
    assert_eq!(result, Value::Str("dog rex".into()));
}

#[test]
fn type_errors_carry_source_context() {
    let err = run_main_err(&[("main.lu", "let x = 1;\nlet y = missing;\nlet result = 0;")]);
    match err {
        LoaderError::Type(text) => {
            assert!(text.contains("unknown identifier 'missing'"), "got: {}", text);
            assert!(text.contains("main.lu:2:9"), "got: {}", text);
            assert!(text.contains("let y = missing;"), "got: {}", text);
        }
        other => panic!("expected a type error, got {}", other),
    }
}

#[test]
fn runtime_errors_are_wrapped_by_the_loader() {
    let err = run_main_err(&[(
        "main.lu",
        "let f = (n: Integer) => 10 / n;\nlet result = f(0);",
    )]);
    match err {
        LoaderError::Runtime(text) => {
            assert!(text.contains("division by zero"), "got: {}", text);
        }
        other => panic!("expected a runtime error, got {}", other),
    }
}

#[test]
fn module_level_statements_run_before_the_importer_continues() {
    let result = run_main(&[
        (
            "store.lu",
            "module store exposing (cell);\nlet cell = {\"n\": 41};\ncell[\"n\"] = 42;\n",
        ),
        (
            "main.lu",
            "use store exposing (cell);\nlet result = cell[\"n\"];",
        ),
    ])
    .expect("load failed");
    assert_eq!(result, Value::Int(42));
}

// ---------------------------------------------------------------------------
// Native modules
// ---------------------------------------------------------------------------

#[test]
fn math_module() {
    let result = run_main(&[(
        "main.lu",
        "use math;\nlet result = math.floor(3.9) + math.round(2.2);",
    )])
    .expect("load failed");
    assert_eq!(result, Value::Int(5));
}

#[test]
fn string_module() {
    let result = run_main(&[(
        "main.lu",
        "use string as str;\nlet result = str.upper(str.trim(\"  hi  \"));",
    )])
    .expect("load failed");
    assert_eq!(result, Value::Str("HI".into()));
}

#[test]
fn string_split_and_join() {
    let result = run_main(&[(
        "main.lu",
        "use string as str;\nlet result = str.join(str.split(\"a,b,c\", \",\"), \"-\");",
    )])
    .expect("load failed");
    assert_eq!(result, Value::Str("a-b-c".into()));
}

#[test]
fn json_module_round_trip() {
    let result = run_main(&[(
        "main.lu",
        "use json;\n\
         let parsed = match (json.parse(\"{\\\"n\\\": [1, 2]}\")) { Ok(v) => v, Err(m) => NULL };\n\
         let result = json.stringify(parsed);",
    )])
    .expect("load failed");
    assert_eq!(result, Value::Str("{\"n\":[1,2]}".into()));
}

#[test]
fn hash_module_helpers() {
    let result = run_main(&[(
        "main.lu",
        "use hash;\nlet h = {\"a\": 1, \"b\": 2};\nlet result = hash.size(h) + len(hash.keys(h));",
    )])
    .expect("load failed");
    assert_eq!(result, Value::Int(4));
}

#[test]
fn datetime_civil_math() {
    let result = run_main(&[(
        "main.lu",
        "use datetime;\nlet result = datetime.iso(86400);",
    )])
    .expect("load failed");
    assert_eq!(result, Value::Str("1970-01-02".into()));
}

#[test]
fn sqlite_module_round_trip() {
    let result = run_main(&[(
        "main.lu",
        "use sqlite;\n\
         let run = fn run() -> Result<Integer, String> => {\n\
           let conn = sqlite.open(\":memory:\")?;\n\
           sqlite.execute(conn, \"CREATE TABLE pets (name TEXT, age INTEGER)\")?;\n\
           sqlite.execute(conn, \"INSERT INTO pets VALUES ('rex', 3)\")?;\n\
           sqlite.execute(conn, \"INSERT INTO pets VALUES ('ada', 5)\")?;\n\
           let rows = sqlite.query(conn, \"SELECT name, age FROM pets ORDER BY name\")?;\n\
           let oldest = rows[0];\n\
           sqlite.close(conn)?;\n\
           Ok(len(rows) * 100 + oldest[\"age\"]);\n\
         };\n\
         let result = match (run()) { Ok(v) => v, Err(e) => 0 - len(e) };",
    )])
    .expect("load failed");
    // Two rows; `ada` sorts first with age 5.
    assert_eq!(result, Value::Int(205));
}

#[test]
fn sqlite_bad_sql_is_an_err_value() {
    let result = run_main(&[(
        "main.lu",
        "use sqlite;\n\
         let result = match (sqlite.open(\":memory:\")) {\n\
           Ok(conn) => match (sqlite.execute(conn, \"NOT REAL SQL\")) {\n\
             Ok(n) => \"ran\",\n\
             Err(e) => \"rejected\"\n\
           },\n\
           Err(e) => \"unopenable\"\n\
         };",
    )])
    .expect("load failed");
    assert_eq!(result, Value::Str("rejected".into()));
}

#[test]
fn fs_module_round_trip() {
    let dir = project(&[("main.lu", "")]);
    let data = dir.join("data.txt");
    let src = format!(
        "use fs;\n\
         fs.writeFile({path:?}, \"hello\");\n\
         let result = match (fs.readFile({path:?})) {{ Ok(s) => s, Err(e) => e }};",
        path = data.to_string_lossy()
    );
    fs::write(dir.join("main.lu"), src).unwrap();
    let mut loader = ModuleLoader::new(&dir);
    let module = loader.run_file(&dir.join("main.lu")).expect("load failed");
    assert_eq!(module.value_env.get("result"), Some(Value::Str("hello".into())));
    assert_eq!(repr(&module.value_env.get("result").unwrap()), "hello");
}
