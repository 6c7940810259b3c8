use feedsel_solver::{solve_for, Catalog, FeedPool, Requirements};

fn main() {
    println!("=== Component Selection Demo ===\n");

    let catalog: Catalog = serde_json::from_str(
        r#"{
        "interfaces": {
            "http://example.com/editor": {
                "implementations": [
                    {"id": "editor-2.1", "version": "2.1",
                     "commands": [{"name": "run", "path": "bin/editor"}],
                     "requires": [{"interface": "http://example.com/spell", "version": ">=1.0"}]},
                    {"id": "editor-1.0", "version": "1.0",
                     "commands": [{"name": "run", "path": "bin/editor"}]}
                ]
            },
            "http://example.com/spell": {
                "implementations": [
                    {"id": "spell-1.4", "version": "1.4"},
                    {"id": "spell-0.9", "version": "0.9"}
                ]
            }
        }
    }"#,
    )
    .expect("demo catalogue is valid");

    let mut requirements = Requirements::new("http://example.com/editor").with_command("run");
    requirements.os = Some("Linux".to_string());
    requirements.machine = Some("x86_64".to_string());

    println!("1. Solving for {} (command: run):", requirements.interface);
    let (ok, solution) =
        solve_for(&requirements, |scope| FeedPool::new(&catalog, scope)).expect("solve");
    println!("   ok = {}\n", ok);

    println!("2. Selected implementations:");
    for (iface, selected) in solution.implementations() {
        match selected {
            Some((_, imp)) => println!("   {} -> {}", iface, imp),
            None => println!("   {} -> (unused)", iface),
        }
    }
    println!();

    println!("3. Selections document:\n");
    print!("{}", solution.selections());
}
