use shardgrid_routing::RoutingNode;

pub fn show(routing_path: &str, node: Option<&str>) -> anyhow::Result<()> {
    let table = super::load_routing(routing_path)?;
    let ids = match node {
        Some(id) => vec![id.to_string()],
        None => table.node_ids(),
    };
    for id in ids {
        let listing = table.read_node(&id, RoutingNode::pretty_print)?;
        print!("{listing}");
    }
    Ok(())
}
