use jslisp::ast::Value;
use jslisp::evaluator::{self, Env};
use jslisp::json;
use jslisp::reader;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::panic;
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

fn main() {
    let result = panic::catch_unwind(|| {
        run_repl();
    });

    if let Err(panic_info) = result {
        eprintln!("The REPL encountered an unexpected error and must exit.");

        if let Some(msg) = panic_info.downcast_ref::<&str>() {
            eprintln!("Error: {msg}");
        } else if let Some(msg) = panic_info.downcast_ref::<String>() {
            eprintln!("Error: {msg}");
        } else {
            eprintln!("Error: Unknown panic occurred");
        }

        process::exit(1);
    }
}

fn run_repl() {
    println!("jslisp - a small Lisp over a JavaScript-flavored host");
    println!("Enter forms like: (let ((x 3)) (1+ x))");
    println!("Type :help for commands, or Ctrl+C to exit.");
    println!();

    let mut rl = DefaultEditor::new().expect("Could not initialize REPL");
    let env = evaluator::create_root_env();
    register_host_demo_bindings(&env);

    loop {
        match rl.readline("jslisp> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                match line {
                    ":help" => {
                        print_help();
                        continue;
                    }
                    ":env" => {
                        print_environment(&env);
                        continue;
                    }
                    ":quit" | ":exit" => {
                        println!("Goodbye!");
                        break;
                    }
                    _ => {}
                }

                // :json <form> prints the result as host JSON
                if let Some(form_src) = line.strip_prefix(":json ") {
                    match evaluator::run(form_src, &env).and_then(|v| json::print_json(&v)) {
                        Ok(text) => println!("{text}"),
                        Err(e) => println!("Error: {e}"),
                    }
                    continue;
                }

                // Every top-level form on the line runs in order; the last
                // value is printed.
                let mut printed_error = false;
                let mut last = Value::Null;
                for form in reader::read(line) {
                    match form.and_then(|f| evaluator::resolve(&f, &env)) {
                        Ok(value) => last = value,
                        Err(e) => {
                            println!("Error: {e}");
                            printed_error = true;
                            break;
                        }
                    }
                }
                if !printed_error {
                    println!("{last}");
                }
            }

            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
}

/// Demonstration host bindings: a clock and a host-info object, reachable
/// from scripts through the environment chain.
fn register_host_demo_bindings(env: &Env) {
    let host = env.host();

    host.register_function("now", |_args, _env| {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as f64)
            .unwrap_or(f64::NAN);
        Ok(Value::Number(millis))
    });

    if let Err(e) = json::define_json(
        &host,
        "host-info",
        &format!(
            r#"{{"os": "{}", "arch": "{}"}}"#,
            std::env::consts::OS,
            std::env::consts::ARCH
        ),
    ) {
        eprintln!("warning: could not seed host-info: {e}");
    }
}

fn print_help() {
    println!("jslisp REPL:");
    println!("  :help        - Show this help message");
    println!("  :env         - Show host-scope bindings");
    println!("  :json <form> - Evaluate a form and print the result as JSON");
    println!("  :quit        - Exit the interpreter");
    println!("  Ctrl+C       - Exit the interpreter");
    println!();
    println!("Language quick reference:");
    println!("  Literals:    42, 0x40, 0100, \"text\", :keyword, t, nil, undefined");
    println!("  Binding:     (let ((x 1)) ...), (setq x 2), (defun f (a) ...)");
    println!("  Control:     (if test then else...), (when test ...), (try ... (catch (e) ...))");
    println!("  Comparison:  (== 2 \"2\") is true, (=== 2 \"2\") is false");
    println!("  Host:        (new Ctor ...), (funcall obj path ...), obj.field, (object :k v)");
    println!("  Demo hosts:  (now), host-info.os");
    println!();
    println!("Examples:");
    println!("  (let ((x 3) (f (lambda () (setq x (1+ x))))) (f) (f) x)");
    println!("  (format nil \"The %2$s contains %1$d monkeys\" 5 \"tree\")");
    println!("  (join \", \" (list 1) (list 2))");
    println!();
}

fn print_environment(env: &Env) {
    let host = env.host();
    let names = host.names();

    if names.is_empty() {
        println!("Host scope is empty.");
        return;
    }

    // Separate callables from plain values
    let mut callables = Vec::new();
    let mut plain = Vec::new();

    for name in names {
        match host.get(&name) {
            Some(value) if value.is_callable() => callables.push(name),
            Some(value) => plain.push((name, value)),
            None => {}
        }
    }

    if !callables.is_empty() {
        println!("Callables ({}):", callables.len());
        let mut col = 0;
        for name in callables {
            print!("  {name:<15}");
            col += 1;
            if col % 4 == 0 {
                println!();
            }
        }
        if col % 4 != 0 {
            println!();
        }
        println!();
    }

    if !plain.is_empty() {
        println!("Values ({}):", plain.len());
        for (name, value) in plain {
            println!("  {name} = {value}");
        }
    }
}
