/*!

This is the long-form manual for `chamber_voting` and `chambertally`.

## How an election resolves

An election fills a fixed number of seats from a single set of ballots.
Each ballot ranks candidates in preference order; only the first choice is
a vote, the later choices feed the tie-break machinery. Seats are filled
over sequential passes. In each pass:

1. The primary choices of all ballots are tallied over the candidates not
   yet elected. A ballot whose first choice is already elected (or whose
   choices are empty) is invalid for the pass and leaves the denominator.
2. A candidate with a strict majority of the valid votes takes a seat.
   Exactly half is not a majority.
3. Without a majority winner, the contest narrows: to the top two
   candidates if they jointly hold a strict majority, else to the top
   three under the same condition, else the leader and the leader of the
   pool without them meet in a two-way runoff.
4. Candidates that a tally cannot separate go through the tie-break
   cascade, in fixed order: the presidential preference order, then
   second-choice support, third-choice support and so on, and finally the
   configured absolute rule, which always decides.

The audit trail of every counting round, and the strategy that settled
each seat, are part of the result.

## Input format

`chambertally` reads ballots from a CSV file. Each row is one ballot: a
voter id, then one column per preference, most preferred first. Blank
cells are skipped. An optional count column carries pre-aggregated
ballots.

```text
id,choice 1,choice 2,choice 3
m-001,Ana,Bruno,
m-002,Bruno,,Carla
m-003,,,
```

A row with no choices at all is a recorded abstention: it is rejected
nowhere but never counts towards any denominator.

## Configuration

The program takes a configuration file in JSON:

```text
{
    "outputSettings": {
        "contestName": "Chamber elections 2023",
        "chamber": "Lisboa"
    },
    "ballotFileSources": [
        {
            "provider": "csv",
            "filePath": "ballots.csv",
            "firstVoteColumnIndex": 2,
            "firstVoteRowIndex": 2,
            "idColumnIndex": 1
        }
    ],
    "candidates": [
        { "name": "Ana" },
        { "name": "Bruno" },
        { "name": "Carla" }
    ],
    "rules": {
        "seatCount": 3,
        "seatLabels": ["I Vogal", "II Vogal", "III Vogal"],
        "presidentialOrder": ["Bruno", "Ana", "Carla"],
        "tiebreakPolicy": "candidateName",
        "maxRankingsAllowed": 4
    }
}
```

Notes on the fields:

- all row and column indices are 1-based, following the conventions of
  spreadsheet software;
- `countColumnIndex` (optional) points at a column with the weight of a
  pre-aggregated ballot;
- `presidentialOrder` may rank only part of the candidates, or be absent;
- `tiebreakPolicy` is `candidateName` (ascending name order) or
  `externalOrder`, which requires an `externalTiebreakOrder` list covering
  every candidate it may be asked about;
- `seatLabels` is optional; missing labels become `Seat N`.

*/
