use owo_colors::OwoColorize;

/// Observability seam for the planner, squash engine and log report. The
/// core calls these but never depends on their output format.
pub trait Printer: Send + Sync {
    fn print_up(&self, text: &str);
    fn print_down(&self, text: &str);
    fn print_error(&self, text: &str);
    fn print_success(&self, text: &str);
    fn print_migration_row(&self, date: &str, on_fs: &str, in_db: &str);
}

/// Console printer. Color use is decided at construction, not through
/// global state.
pub struct ConsolePrinter {
    no_color: bool,
}

impl ConsolePrinter {
    pub fn new(no_color: bool) -> Self {
        Self { no_color }
    }
}

impl Printer for ConsolePrinter {
    fn print_up(&self, text: &str) {
        if self.no_color {
            println!("{text}");
        } else {
            println!("{} {}", "⏫".cyan(), text.cyan());
        }
    }

    fn print_down(&self, text: &str) {
        if self.no_color {
            println!("{text}");
        } else {
            println!("{} {}", "⏬".magenta(), text.magenta());
        }
    }

    fn print_error(&self, text: &str) {
        if self.no_color {
            eprintln!("{text}");
        } else {
            eprintln!("{} {}", "❌".red(), text.red());
        }
    }

    fn print_success(&self, text: &str) {
        if self.no_color {
            println!("{text}");
        } else {
            println!("{} {}", "✔️".green(), text.green());
        }
    }

    fn print_migration_row(&self, date: &str, on_fs: &str, in_db: &str) {
        let fs = if on_fs.is_empty() {
            String::new()
        } else {
            format!("fs: {on_fs}")
        };
        let db = if in_db.is_empty() {
            String::new()
        } else {
            format!("db: {in_db}")
        };

        if self.no_color {
            println!("{date}   |   {fs} / {db}");
        } else {
            println!("{date}   |   {} / {}", fs.magenta(), db.yellow());
        }
    }
}
