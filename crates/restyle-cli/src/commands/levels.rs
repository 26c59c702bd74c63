use console::style;
use restyle::settings::PERSONALITY_LEVELS;

pub fn handle_levels() {
    for (index, level) in PERSONALITY_LEVELS.iter().enumerate() {
        println!(
            "{} {} {}",
            style(index).bold(),
            style(level.name).cyan(),
            style(format!("- {}", level.style)).dim()
        );
    }
}
