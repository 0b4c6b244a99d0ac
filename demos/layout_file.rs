use ::behavior_tree_editor::{Editor, EditorConfig, GraphView};
use anyhow::{anyhow, Context};
use std::fs;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let file = args
        .next()
        .unwrap_or_else(|| "demos/patrol.bhbtree".to_owned());
    let config = match args.next() {
        Some(config) => EditorConfig::load(&config).with_context(|| format!("reading {}", config))?,
        None => EditorConfig::default(),
    };
    if !config.accepts_file(&file) {
        return Err(anyhow!("{} is not a tree file", file));
    }

    let source = fs::read_to_string(&file).with_context(|| format!("reading {}", file))?;
    let mut editor = Editor::new(Default::default(), config);
    for warning in editor.load_xml(&source)? {
        println!("warning: {}", warning);
    }

    let names: Vec<String> = editor.tab_names().map(str::to_owned).collect();
    for name in &names {
        let tree = editor.tree(name)?;
        println!("{}:\n{}", name, tree);
        let scene = editor.tab(name).ok_or_else(|| anyhow!("no tab {}", name))?;
        for node in tree.nodes() {
            if let Some(pos) = node.graphic_node.and_then(|id| scene.position(id)) {
                println!("  {:<20} ({:>7.1}, {:>7.1})", node.instance_name, pos.x, pos.y);
            }
        }
    }

    println!("{}", editor.save_xml()?);
    Ok(())
}
