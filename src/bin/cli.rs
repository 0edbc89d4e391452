use std::fs;
use std::io::{self, Write};

use timetable_tool::week::parse_day;
use timetable_tool::{
    CurriculumType, EntryId, EntryPatch, FileKeyValueStore, InMemoryCatalog, Mutation, PeriodId,
    ReplacePlan, SequentialIds, Timetable, TimetableEntry, WeekGrid, WeekGridConfig,
    load_entries_from_csv, save_entries_to_csv,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const ID_PREFIX: &str = "entry";

fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (ci, cell) in row.iter().enumerate() {
            if cell.len() > widths[ci] {
                widths[ci] = cell.len();
            }
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let render_row = |cells: &[String]| {
        let mut line = String::from("|");
        for (ci, cell) in cells.iter().enumerate() {
            line.push(' ');
            line.push_str(cell);
            line.push_str(&" ".repeat(widths[ci].saturating_sub(cell.len())));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(headers));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in rows {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn render_entries(entries: &[TimetableEntry]) -> String {
    let headers: Vec<String> = ["id", "class", "day", "period", "subject", "teacher", "curriculum"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|e| {
            vec![
                e.id.to_string(),
                e.class_id.clone(),
                e.day.to_string(),
                e.period_id.to_string(),
                e.subject_id.clone(),
                e.teacher_id.clone(),
                e.curriculum_type.as_str().to_string(),
            ]
        })
        .collect();
    render_table(&headers, &rows)
}

/// Periods down, days across; each cell is `subject/teacher`.
fn render_class_week(timetable: &Timetable, class_id: &str) -> String {
    let grid = timetable.grid();
    let entries = timetable.entries_for_class(class_id);
    let mut headers = vec!["period".to_string()];
    headers.extend(grid.days().iter().map(|d| d.to_string()));

    let mut rows = Vec::new();
    for period in grid.periods() {
        let mut row = vec![format!("{} {}", period.label, period.start.format("%H:%M"))];
        for day in grid.days() {
            let cell = entries
                .iter()
                .find(|e| e.day == *day && e.period_id == period.id)
                .map(|e| format!("{}/{}", e.subject_id, e.teacher_id))
                .unwrap_or_else(|| {
                    if period.kind.is_teaching() {
                        String::new()
                    } else {
                        period.kind.as_str().to_string()
                    }
                });
            row.push(cell);
        }
        rows.push(row);
    }
    render_table(&headers, &rows)
}

fn print_help() {
    println!(
        "Commands:\n  help                                   Show this help\n  list                                   Show every lesson\n  show <class>                           Show a class's week\n  teacher <id>                           Lessons taught by a teacher\n  slot <day> <period>                    Lessons in a slot across classes\n  assign <class> <day> <period> <subject> <teacher>\n                                         Add a lesson\n  move <entry> <day> <period>            Move a lesson within its class\n  update <entry> subject|teacher|curriculum <value>\n                                         Edit a lesson\n  delete <entry>                         Delete a lesson\n  conflicts <entry>                      Teacher/room conflicts of a lesson\n  report                                 Every double-booking in the school\n  template save <class>                  Capture a class's week\n  template show <class>                  Show a saved template\n  template list                          List saved templates\n  template load <class> [--force]        Replace a class's week with its template\n  copy <source> <target> [--force]       Overwrite target's week with source's\n  grid show                              Show the week grid\n  grid set <json_path>                   Load a week grid config\n  grid save <json_path>                  Save the week grid config\n  stats                                  Fill rates and teacher loads\n  save <json|csv> <path>                 Write lessons and templates (json: directory)\n  load <json|csv> <path>                 Replace the timetable with a saved copy;\n                                         later edits stay in memory until the next save\n  quit|exit                              Exit"
    );
}

fn print_mutation(verb: &str, mutation: &Mutation) {
    println!(
        "{} {} ({} {} {}) for class {} on {}.",
        verb,
        mutation.entry.id,
        mutation.entry.subject_id,
        mutation.entry.teacher_id,
        mutation.entry.curriculum_type.as_str(),
        mutation.entry.class_id,
        mutation.entry.slot()
    );
    for warning in &mutation.warnings {
        println!("Warning: {}", warning.message);
    }
}

fn print_plan(plan: &ReplacePlan) {
    println!(
        "Class {} will receive {} lesson(s) and lose {}.",
        plan.class_id,
        plan.incoming,
        plan.discarded.len()
    );
    if plan.is_destructive() {
        println!("{}", render_entries(&plan.discarded));
    }
}

fn print_grid(grid: &WeekGrid) {
    let days = grid
        .days()
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    println!("School days        : {}", days);
    println!("Teaching slots     : {}", grid.teaching_slot_count());
    for period in grid.periods() {
        println!(
            "  {:>3}  {:<10} {}-{}  {}",
            period.id,
            period.label,
            period.start.format("%H:%M"),
            period.end.format("%H:%M"),
            period.kind.as_str()
        );
    }
}

fn print_stats(timetable: &Timetable) {
    match timetable.class_fill_rates(&[]) {
        Ok(rates) => {
            println!("Class fill rates:");
            for rate in rates {
                println!(
                    "  {:<16} {:>3}/{:<3} {:>5.1}%",
                    rate.class_name,
                    rate.lessons,
                    rate.teaching_slots,
                    rate.fill_rate * 100.0
                );
            }
        }
        Err(e) => println!("Error computing fill rates: {}", e),
    }
    match timetable.teacher_loads() {
        Ok(loads) => {
            println!("Teacher loads:");
            for load in loads {
                println!(
                    "  {:<16} {:>3} lesson(s) over {} day(s)",
                    load.teacher_name, load.lessons, load.days_taught
                );
            }
        }
        Err(e) => println!("Error computing teacher loads: {}", e),
    }
}

fn parse_slot(day: Option<&str>, period: Option<&str>) -> Option<(chrono::Weekday, PeriodId)> {
    let day = parse_day(day?)?;
    let period = period?.parse::<PeriodId>().ok()?;
    Some((day, period))
}

/// Continues `entry-N` numbering past everything already stored.
fn resume_ids(timetable: &mut Timetable) {
    let existing: Vec<EntryId> = timetable
        .entries()
        .iter()
        .map(|e| e.id.clone())
        .chain(
            timetable
                .templates()
                .flat_map(|t| t.entries.iter().map(|e| e.id.clone())),
        )
        .collect();
    timetable.set_id_generator(SequentialIds::resume(ID_PREFIX, existing.iter()));
}

fn load_catalog() -> InMemoryCatalog {
    let Ok(path) = std::env::var("TIMETABLE_TOOL_CATALOG") else {
        return InMemoryCatalog::new();
    };
    match fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|contents| serde_json::from_str(&contents).map_err(|e| e.to_string()))
    {
        Ok(catalog) => catalog,
        Err(e) => {
            println!("Ignoring catalog {}: {}", path, e);
            InMemoryCatalog::new()
        }
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let mut timetable =
        Timetable::new(load_catalog()).with_id_generator(SequentialIds::new(ID_PREFIX));

    println!("Timetable Tool (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let Some(cmd) = parts.next() else {
            continue;
        };
        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "list" => println!("{}", render_entries(timetable.entries())),
            "show" => match parts.next() {
                Some(class_id) => println!("{}", render_class_week(&timetable, class_id)),
                None => println!("Usage: show <class>"),
            },
            "teacher" => match parts.next() {
                Some(teacher_id) => {
                    println!("{}", render_entries(&timetable.entries_for_teacher(teacher_id)))
                }
                None => println!("Usage: teacher <id>"),
            },
            "slot" => match parse_slot(parts.next(), parts.next()) {
                Some((day, period)) => {
                    println!("{}", render_entries(&timetable.entries_in_slot(day, period)))
                }
                None => println!("Usage: slot <day> <period>"),
            },
            "assign" => {
                let class_id = parts.next();
                let slot = parse_slot(parts.next(), parts.next());
                let subject = parts.next();
                let teacher = parts.next();
                match (class_id, slot, subject, teacher) {
                    (Some(class_id), Some((day, period)), Some(subject), Some(teacher)) => {
                        match timetable.assign(class_id, day, period, subject, teacher) {
                            Ok(mutation) => print_mutation("Assigned", &mutation),
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    _ => println!("Usage: assign <class> <day> <period> <subject> <teacher>"),
                }
            }
            "move" => {
                let id = parts.next();
                let slot = parse_slot(parts.next(), parts.next());
                match (id, slot) {
                    (Some(id), Some((day, period))) => {
                        match timetable.move_entry(&EntryId::from(id), day, period) {
                            Ok(mutation) => print_mutation("Moved", &mutation),
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    _ => println!("Usage: move <entry> <day> <period>"),
                }
            }
            "update" => {
                let id = parts.next();
                let field = parts.next();
                let value = parts.next();
                let patch = match (field, value) {
                    (Some("subject"), Some(v)) => Some(EntryPatch::subject(v)),
                    (Some("teacher"), Some(v)) => Some(EntryPatch::teacher(v)),
                    (Some("curriculum"), Some(v)) => match CurriculumType::from_str(v) {
                        Some(curriculum) => Some(EntryPatch {
                            curriculum_type: Some(curriculum),
                            ..EntryPatch::default()
                        }),
                        None => {
                            println!("Unknown curriculum type '{}'.", v);
                            continue;
                        }
                    },
                    _ => None,
                };
                match (id, patch) {
                    (Some(id), Some(patch)) => match timetable.update(&EntryId::from(id), patch) {
                        Ok(mutation) => print_mutation("Updated", &mutation),
                        Err(e) => println!("Error: {}", e),
                    },
                    _ => println!("Usage: update <entry> subject|teacher|curriculum <value>"),
                }
            }
            "delete" => match parts.next() {
                Some(id) => match timetable.delete(&EntryId::from(id)) {
                    Ok(removed) => println!("Deleted {}.", removed.id),
                    Err(e) => println!("Error: {}", e),
                },
                None => println!("Usage: delete <entry>"),
            },
            "conflicts" => match parts.next() {
                Some(id) => match timetable.conflict_info(&EntryId::from(id)) {
                    Ok(info) if !info.has_conflict() => println!("No conflicts for {}.", id),
                    Ok(info) => {
                        if let Some(class_id) = &info.conflicting_teacher_class {
                            println!("Teacher also teaches {} in that slot.", class_id);
                        }
                        if let Some(class_id) = &info.conflicting_room_class {
                            println!("Room is also used by {} in that slot.", class_id);
                        }
                    }
                    Err(e) => println!("Error: {}", e),
                },
                None => println!("Usage: conflicts <entry>"),
            },
            "report" => {
                let report = timetable.conflict_report();
                if report.is_empty() {
                    println!("No double-bookings.");
                }
                for conflict in report {
                    println!(
                        "{} {} double-booked on {}: {} ({}) and {} ({})",
                        conflict.kind.as_str(),
                        conflict.resource_id,
                        conflict.slot,
                        conflict.first_class,
                        conflict.first,
                        conflict.second_class,
                        conflict.second
                    );
                }
            }
            "template" => match (parts.next(), parts.next()) {
                (Some("list"), _) => {
                    for template in timetable.templates() {
                        println!(
                            "  {:<12} {} ({} lesson(s), {})",
                            template.class_id,
                            template.name,
                            template.entries.len(),
                            template.captured_at.format("%Y-%m-%d %H:%M")
                        );
                    }
                }
                (Some("save"), Some(class_id)) => match timetable.save_template(class_id) {
                    Ok(template) => println!(
                        "Saved template '{}' with {} lesson(s).",
                        template.name,
                        template.entries.len()
                    ),
                    Err(e) => println!("Error: {}", e),
                },
                (Some("show"), Some(class_id)) => match timetable.template(class_id) {
                    Some(template) => {
                        println!("Template '{}':", template.name);
                        println!("{}", render_entries(&template.entries));
                    }
                    None => println!("No template saved for class {}.", class_id),
                },
                (Some("load"), Some(class_id)) => {
                    let force = parts.next() == Some("--force");
                    match timetable.plan_load_template(class_id) {
                        Ok(plan) if plan.is_destructive() && !force => {
                            print_plan(&plan);
                            println!("Re-run with --force to overwrite class {}.", class_id);
                        }
                        Ok(_) => match timetable.load_template(class_id) {
                            Ok(outcome) => println!(
                                "Loaded template into class {}: {} lesson(s) installed, {} discarded.",
                                outcome.class_id,
                                outcome.installed.len(),
                                outcome.discarded.len()
                            ),
                            Err(e) => println!("Error: {}", e),
                        },
                        Err(e) => println!("Error: {}", e),
                    }
                }
                _ => println!("Usage: template save|show|load <class> | template list"),
            },
            "copy" => {
                let source = parts.next();
                let target = parts.next();
                let force = parts.next() == Some("--force");
                match (source, target) {
                    (Some(source), Some(target)) => match timetable.plan_copy(source, target) {
                        Ok(plan) if plan.is_destructive() && !force => {
                            print_plan(&plan);
                            println!("Re-run with --force to overwrite class {}.", target);
                        }
                        Ok(_) => match timetable.copy_schedule(source, target) {
                            Ok(outcome) => println!(
                                "Copied {} lesson(s) from {} to {} ({} discarded).",
                                outcome.installed.len(),
                                source,
                                target,
                                outcome.discarded.len()
                            ),
                            Err(e) => println!("Error: {}", e),
                        },
                        Err(e) => println!("Error: {}", e),
                    },
                    _ => println!("Usage: copy <source> <target> [--force]"),
                }
            }
            "grid" => match parts.next() {
                Some("show") | None => print_grid(timetable.grid()),
                Some("set") => match parts.next() {
                    Some(path) => match fs::read_to_string(path) {
                        Ok(contents) => match serde_json::from_str::<WeekGridConfig>(&contents) {
                            Ok(config) => match WeekGrid::from_config(&config) {
                                Ok(grid) => match timetable.set_grid(grid) {
                                    Ok(_) => {
                                        println!("Week grid updated from {}.", path);
                                        print_grid(timetable.grid());
                                    }
                                    Err(e) => println!("Error: {}", e),
                                },
                                Err(e) => println!("Invalid week grid: {}", e),
                            },
                            Err(e) => println!("Invalid week grid JSON: {}", e),
                        },
                        Err(e) => println!("Error reading {}: {}", path, e),
                    },
                    None => println!("Usage: grid set <json_path>"),
                },
                Some("save") => match parts.next() {
                    Some(path) => match serde_json::to_string_pretty(&timetable.grid().to_config()) {
                        Ok(json) => match fs::write(path, json) {
                            Ok(_) => println!("Week grid saved to {}.", path),
                            Err(e) => println!("Error writing {}: {}", path, e),
                        },
                        Err(e) => println!("Error serializing week grid: {}", e),
                    },
                    None => println!("Usage: grid save <json_path>"),
                },
                Some(other) => {
                    println!("Unknown grid command '{}'.", other);
                    println!("Usage: grid show|set <json_path>|save <json_path>");
                }
            },
            "stats" => print_stats(&timetable),
            "save" => match (parts.next(), parts.next()) {
                (Some("json"), Some(path)) => {
                    match FileKeyValueStore::new(path).and_then(|kv| timetable.save_to(&kv)) {
                        Ok(_) => println!("Timetable saved to {}.", path),
                        Err(e) => println!("Error saving timetable: {}", e),
                    }
                }
                (Some("csv"), Some(path)) => match save_entries_to_csv(timetable.entries(), path) {
                    Ok(_) => println!("Timetable saved to {}.", path),
                    Err(e) => println!("Error saving timetable: {}", e),
                },
                _ => println!("Usage: save <json|csv> <path>"),
            },
            "load" => match (parts.next(), parts.next()) {
                (Some("json"), Some(path)) => {
                    match FileKeyValueStore::new(path).and_then(|kv| timetable.load_from(&kv)) {
                        Ok(_) => {
                            resume_ids(&mut timetable);
                            println!("Timetable loaded from {}.", path);
                            println!("{}", render_entries(timetable.entries()));
                        }
                        Err(e) => println!("Error loading timetable: {}", e),
                    }
                }
                (Some("csv"), Some(path)) => match load_entries_from_csv(path) {
                    Ok(entries) => match timetable.replace_all(entries) {
                        Ok(_) => {
                            resume_ids(&mut timetable);
                            println!("Timetable loaded from {}.", path);
                            println!("{}", render_entries(timetable.entries()));
                        }
                        Err(e) => println!("Error loading timetable: {}", e),
                    },
                    Err(e) => println!("Error loading timetable: {}", e),
                },
                _ => println!("Usage: load <json|csv> <path>"),
            },
            _ => println!("Unknown command. Type 'help'."),
        }
    }
}
