use yardstick::Engine;

fn main() {
    use std::io::{stdin, stdout, Write};
    let mut s = String::new();
    print!("Please enter an expression: ");
    let _ = stdout().flush();
    stdin().read_line(&mut s).expect("Did not enter a correct string");
    if let Some('\n') = s.chars().next_back() {
        s.pop();
    }
    if let Some('\r') = s.chars().next_back() {
        s.pop();
    }

    let mut engine = Engine::new();
    match engine.evaluate(&s) {
        Ok(value) => println!("{} = {}", s, value),
        Err(e) => println!("Could not evaluate '{}': {}", s, e),
    }
}
