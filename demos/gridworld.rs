//! Grid navigation demo: an agent searches for a goal cell on a small
//! grid, guided by a distance heuristic, then aggregates the visited
//! terminals into a single answer.
//!
//! Run with: `RUST_LOG=debug cargo run --example gridworld`

use async_trait::async_trait;
use serde_json::json;
use wayfarer_mcts::{
    Details, MCTSAggregation, MCTSConfig, OutputStrategy, Result, SearchConfig, SimulateStrategy,
    WeightPolicy, WorldModel, MCTS,
};

#[derive(Clone, Debug, PartialEq)]
struct Cell {
    x: i32,
    y: i32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Dir {
    North,
    South,
    East,
    West,
}

impl Dir {
    const ALL: [Dir; 4] = [Dir::North, Dir::South, Dir::East, Dir::West];

    fn apply(self, cell: &Cell) -> Cell {
        let (dx, dy) = match self {
            Dir::North => (0, -1),
            Dir::South => (0, 1),
            Dir::East => (1, 0),
            Dir::West => (-1, 0),
        };
        Cell {
            x: cell.x + dx,
            y: cell.y + dy,
        }
    }
}

struct Grid {
    goal: Cell,
}

impl Grid {
    fn distance(&self, cell: &Cell) -> i64 {
        ((cell.x - self.goal.x).abs() + (cell.y - self.goal.y).abs()) as i64
    }
}

#[async_trait]
impl WorldModel for Grid {
    type State = Cell;
    type Action = Dir;

    async fn init_state(&mut self) -> Result<Cell> {
        Ok(Cell { x: 0, y: 0 })
    }

    async fn step(&mut self, state: &Cell, action: &Dir) -> Result<(Cell, Details)> {
        let next = action.apply(state);
        // hand the reward function the distance it would otherwise recompute
        let mut aux = Details::new();
        aux.insert("distance".to_string(), json!(self.distance(&next)));
        Ok((next, aux))
    }

    async fn is_terminal(&mut self, state: &Cell) -> Result<bool> {
        Ok(*state == self.goal)
    }
}

struct GridScorer {
    width: i32,
    height: i32,
    goal: Cell,
}

impl GridScorer {
    fn contains(&self, cell: &Cell) -> bool {
        (0..self.width).contains(&cell.x) && (0..self.height).contains(&cell.y)
    }

    fn distance(&self, cell: &Cell) -> i64 {
        ((cell.x - self.goal.x).abs() + (cell.y - self.goal.y).abs()) as i64
    }

    fn closeness(&self, distance: i64) -> f64 {
        1.0 / (1.0 + distance as f64)
    }
}

#[async_trait]
impl SearchConfig<Grid> for GridScorer {
    async fn get_actions(&mut self, state: &Cell) -> Result<Vec<Dir>> {
        Ok(Dir::ALL
            .into_iter()
            .filter(|dir| self.contains(&dir.apply(state)))
            .collect())
    }

    fn fast_reward(&mut self, state: &Cell, action: &Dir) -> (f64, Details) {
        let distance = self.distance(&action.apply(state));
        (self.closeness(distance), Details::new())
    }

    async fn reward(
        &mut self,
        state: &Cell,
        action: &Dir,
        context: &Details,
    ) -> Result<(f64, Details)> {
        let distance = context
            .get("distance")
            .and_then(|value| value.as_i64())
            .unwrap_or_else(|| self.distance(&action.apply(state)));
        let mut details = Details::new();
        details.insert("distance".to_string(), json!(distance));
        Ok((self.closeness(distance), details))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let goal = Cell { x: 3, y: 2 };
    let config = MCTSConfig::default()
        .with_w_exp(1.414)
        .with_depth_limit(8)
        .with_n_iters(64)
        .with_simulate_strategy(SimulateStrategy::Max)
        .with_output_strategy(OutputStrategy::MaxReward);

    let mut mcts = MCTS::<Grid>::new(config)
        .with_aggregator(MCTSAggregation::new(
            |cell: &Cell| Some(format!("({}, {})", cell.x, cell.y)),
            WeightPolicy::Edge,
        ))
        .with_node_visualizer(|node| {
            let mut details = Details::new();
            details.insert("visits".to_string(), json!(node.n()));
            details
        });

    let mut world = Grid { goal: goal.clone() };
    let mut scorer = GridScorer {
        width: 5,
        height: 4,
        goal,
    };

    let result = mcts.search(&mut world, &mut scorer).await?;

    println!("{}", mcts.statistics().summary());
    println!("cumulative reward: {:.3}", result.cum_reward);
    if let Some((states, actions)) = &result.trace {
        println!("trajectory from {:?}:", states[0]);
        for (action, state) in actions.iter().zip(states.iter().skip(1)) {
            println!("  {action:?} -> {state:?}");
        }
    }
    if let Some(answer) = &result.aggregated_result {
        println!("aggregated goal: {answer}");
    }
    println!("\n{}", mcts.render_tree(&result));

    Ok(())
}
