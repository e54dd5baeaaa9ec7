use cfgtree_core::{parse, SettingType};

fn main() {
    let source = r#"
        user = {
            name = "John Doe";
            email = "john.doe@example.com";
            groups = [ "staff", "admin" ];
        };
    "#;

    let mut config = match parse(source, "example.cfg") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to parse configuration: {:?}", miette::Report::new(e));
            return;
        }
    };

    if let Ok(name) = config.lookup("user.name").and_then(|s| s.as_str().map(str::to_owned)) {
        println!("user.name = {name}");
    }

    if let Ok(mut user) = config.lookup_mut("user") {
        if let Ok(mut limits) = user.add("limits", SettingType::Group) {
            let _ = limits.add_value("max_sessions", 4);
        }
    }

    match config.write_string() {
        Ok(text) => println!("Updated configuration:\n{text}"),
        Err(e) => eprintln!("Failed to write configuration: {e}"),
    }
    match config.to_json() {
        Ok(json) => println!("As JSON:\n{json}"),
        Err(e) => eprintln!("Failed to export JSON: {e}"),
    }
}
