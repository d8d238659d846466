// Spatial diagnostics on contiguity weights built from real polygons.

use geo::{polygon, MultiPolygon};
use incomescope::{
    spatial::{global_moran, local_moran, Contiguity, Inference, SpatialWeights},
    Undefined, Value,
};

fn squares(side: usize) -> Vec<MultiPolygon<f64>> {
    (0..side * side)
        .map(|k| {
            let (x, y) = ((k % side) as f64, (k / side) as f64);
            MultiPolygon(vec![polygon![(x: x, y: y), (x: x + 1.0, y: y), (x: x + 1.0, y: y + 1.0), (x: x, y: y + 1.0)]])
        })
        .collect()
}

#[test]
fn rook_and_queen_neighbors_on_a_grid() {
    let geoms = squares(3);
    let rook = SpatialWeights::contiguity(&geoms, Contiguity::Rook).unwrap();
    let queen = SpatialWeights::contiguity(&geoms, Contiguity::Queen).unwrap();

    assert_eq!(rook.neighbor_count(4), 4);
    assert_eq!(queen.neighbor_count(4), 8);
    assert_eq!(rook.neighbor_count(0), 2);
    assert_eq!(queen.neighbor_count(0), 3);
}

#[test]
fn checkerboard_is_dispersed_and_halves_are_clustered() {
    let side = 6;
    let geoms = squares(side);
    let weights = SpatialWeights::contiguity(&geoms, Contiguity::Rook).unwrap();

    let checkerboard = (0..side * side).map(|k| Value::Valid(((k % side + k / side) % 2) as f64)).collect::<Vec<_>>();
    let halves = (0..side * side).map(|k| Value::Valid(if k % side < side / 2 { 1.0 } else { 0.0 })).collect::<Vec<_>>();

    let dispersed = global_moran(&weights, &checkerboard, &Inference::default()).unwrap();
    let clustered = global_moran(&weights, &halves, &Inference::default()).unwrap();

    assert!((dispersed.i + 1.0).abs() < 1e-9);
    assert!(clustered.i > 0.5);
    assert_eq!(dispersed.pattern(0.05), "dispersed");
    assert_eq!(clustered.pattern(0.05), "clustered");
}

#[test]
fn detached_polygon_is_an_island() {
    let mut geoms = squares(4);
    geoms.push(MultiPolygon(vec![polygon![(x: 10.0, y: 10.0), (x: 11.0, y: 10.0), (x: 11.0, y: 11.0), (x: 10.0, y: 11.0)]]));
    let weights = SpatialWeights::contiguity(&geoms, Contiguity::Queen).unwrap();
    assert_eq!(weights.islands(), vec![16]);

    let values = (0..17).map(|k| Value::Valid((k % 4) as f64)).collect::<Vec<_>>();
    let moran = global_moran(&weights, &values, &Inference::default()).unwrap();
    assert_eq!(moran.islands, vec![16]);
    assert_eq!(moran.units, 16);
}

#[test]
fn undefined_values_are_left_out_of_local_statistics() {
    let geoms = squares(5);
    let weights = SpatialWeights::contiguity(&geoms, Contiguity::Queen).unwrap();
    let mut values = (0..25).map(|k| Value::Valid((k % 5) as f64)).collect::<Vec<_>>();
    values[12] = Value::Undefined(Undefined::ZeroDenominator);

    let lisa = local_moran(&weights, &values, &Inference::default()).unwrap();
    assert_eq!(lisa.len(), 25);
    assert!(lisa.i[12].is_none());
    assert_eq!(lisa.undefined, 1);
}
