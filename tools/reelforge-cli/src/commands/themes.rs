//! List the theme catalogue.

use reelforge_job_model::Theme;

pub fn run() -> anyhow::Result<()> {
    println!("Available themes");
    println!("{}", "=".repeat(50));
    for theme in Theme::catalogue() {
        println!(
            "  {:<12} font: {:<10} color: {:<8} box: {:<10} effect: {}",
            theme.name,
            theme.caption_font,
            theme.caption_color,
            theme.caption_bg.unwrap_or("none"),
            theme.effect.map(|e| e.as_str()).unwrap_or("none"),
        );
    }
    Ok(())
}
